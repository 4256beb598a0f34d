//! Terraform plan adapter.
//!
//! Reads the JSON produced by `terraform show -json <planfile>` and emits one
//! descriptor per entry of `resource_changes`. Declared dependencies become
//! explicit references; resource addresses found in attribute values (and
//! in the `configuration` expression references) become attribute
//! references.

use crate::error::IngestError;
use crate::graph::{AdapterOutput, RawReference, ResourceAddress, ResourceDescriptor, SourceKind};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

/// `<type>.<name>[index][.<attribute>]` with an optional `data.` prefix.
/// Resource types always carry a provider prefix separated by an underscore.
static ADDRESS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:data\.)?[a-z][a-z0-9]*_[a-z0-9_]+\.[A-Za-z_][A-Za-z0-9_-]*(?:\[[^\]]*\])?(?:\.[A-Za-z_][A-Za-z0-9_]*)?",
    )
    .unwrap()
});

static RESOURCE_TYPE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9]*_[a-z0-9_]+$").unwrap());

/// A Terraform address reduced to what the resolvers can match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TfAddress {
    /// `[module.m.]<type>.<name>[idx][.attr...]`
    Resource {
        module: Option<String>,
        raw_type: String,
        name: String,
    },
    /// `module.m[.module.n]` with nothing after it.
    Module(String),
}

/// Parse a Terraform plan JSON document.
pub fn parse_plan(content: &[u8], origin: &str) -> Result<AdapterOutput, IngestError> {
    let plan: Value =
        serde_json::from_slice(content).map_err(|e| IngestError::parse(origin, e))?;

    let Some(root) = plan.as_object() else {
        return Err(IngestError::parse(origin, "plan must be a JSON object"));
    };

    let changes = match root.get("resource_changes") {
        Some(Value::Array(items)) => items.as_slice(),
        Some(Value::Null) => &[],
        Some(_) => {
            return Err(IngestError::parse(
                origin,
                "`resource_changes` must be an array",
            ));
        }
        // Terraform leaves the key out when nothing changes.
        None if root.contains_key("format_version") || root.contains_key("planned_values") => &[],
        None => {
            return Err(IngestError::parse(
                origin,
                "no `resource_changes` list found; is this a `terraform show -json` plan?",
            ));
        }
    };

    let mut config = HashMap::new();
    if let Some(root_module) = root
        .get("configuration")
        .and_then(|c| c.get("root_module"))
    {
        collect_configuration(root_module, None, &mut config);
    }

    let mut output = AdapterOutput::new();
    for (i, change) in changes.iter().enumerate() {
        // create_before_destroy leaves the old object under the same address
        if let Some(deposed) = get_str(change, "deposed") {
            log::debug!(
                "{}: skipping deposed object {} of {}",
                origin,
                deposed,
                get_str(change, "address").unwrap_or("?")
            );
            continue;
        }
        match parse_resource_change(change, origin, &config) {
            Some(descriptor) => output.descriptors.push(descriptor),
            None => output.warn(format!(
                "{}: skipping resource_changes[{}]: no type or name",
                origin, i
            )),
        }
    }

    log::debug!(
        "Parsed {} Terraform resources from {}",
        output.descriptors.len(),
        origin
    );
    Ok(output)
}

/// References declared in the `configuration` block for one resource.
#[derive(Debug, Default)]
struct ConfigEntry {
    depends_on: Vec<String>,
    references: Vec<String>,
}

/// (module path, raw type, resource name without index)
type ConfigKey = (Option<String>, String, String);

fn collect_configuration(
    module: &Value,
    path: Option<String>,
    out: &mut HashMap<ConfigKey, ConfigEntry>,
) {
    if let Some(resources) = module.get("resources").and_then(|r| r.as_array()) {
        for resource in resources {
            let (Some(type_), Some(name)) = (get_str(resource, "type"), get_str(resource, "name"))
            else {
                continue;
            };
            let raw_type = qualified_type(get_str(resource, "mode"), type_);
            let entry = out
                .entry((path.clone(), raw_type, name.to_string()))
                .or_default();
            entry.depends_on.extend(string_array(resource.get("depends_on")));
            if let Some(expressions) = resource.get("expressions") {
                collect_expression_references(expressions, &mut entry.references);
            }
        }
    }

    if let Some(calls) = module.get("module_calls").and_then(|c| c.as_object()) {
        for (call_name, call) in calls {
            let child_path = match &path {
                Some(parent) => format!("{}.module.{}", parent, call_name),
                None => format!("module.{}", call_name),
            };
            if let Some(child) = call.get("module") {
                collect_configuration(child, Some(child_path), out);
            }
        }
    }
}

/// Expressions nest arbitrarily (blocks inside blocks); every `references`
/// list of strings at any depth is collected.
fn collect_expression_references(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "references" {
                    out.extend(string_array(Some(child)));
                } else {
                    collect_expression_references(child, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_expression_references(item, out);
            }
        }
        _ => {}
    }
}

fn parse_resource_change(
    change: &Value,
    origin: &str,
    config: &HashMap<ConfigKey, ConfigEntry>,
) -> Option<ResourceDescriptor> {
    let (module, raw_type, base_name, name) = resource_identity(change)?;

    let planned = change.get("change");
    let attributes = planned
        .and_then(|c| c.get("after"))
        .and_then(|v| v.as_object())
        .or_else(|| {
            planned
                .and_then(|c| c.get("before"))
                .and_then(|v| v.as_object())
        })
        .cloned()
        .unwrap_or_default();

    let mut explicit: BTreeSet<String> = string_array(change.get("depends_on")).collect();
    let mut attribute_refs = BTreeSet::new();
    scan_attributes(&attributes, &mut attribute_refs);

    if let Some(entry) = config.get(&(module.clone(), raw_type.clone(), base_name)) {
        explicit.extend(entry.depends_on.iter().cloned());
        attribute_refs.extend(entry.references.iter().cloned());
    }

    let mut descriptor = ResourceDescriptor::new(SourceKind::Terraform, &raw_type, &name, origin)
        .with_namespace(module)
        .with_attributes(attributes);

    for text in explicit {
        match parse_address(&text) {
            Some(TfAddress::Resource {
                module,
                raw_type,
                name,
            }) => {
                let mut target = ResourceAddress::new(raw_type, name);
                target.namespace = module;
                descriptor
                    .raw_references
                    .push(RawReference::explicit(text, target));
            }
            Some(TfAddress::Module(module)) => descriptor
                .raw_references
                .push(RawReference::explicit_module(text, module)),
            None => log::debug!("{}: ignoring dependency `{}`", origin, text),
        }
    }

    for text in attribute_refs {
        if let Some(TfAddress::Resource {
            module,
            raw_type: ref_type,
            name: ref_name,
        }) = parse_address(&text)
        {
            if ref_type == descriptor.raw_type && ref_name == descriptor.raw_name {
                continue;
            }
            let mut target = ResourceAddress::new(ref_type, ref_name);
            target.namespace = module;
            descriptor
                .raw_references
                .push(RawReference::attribute(text, target));
        }
    }

    Some(descriptor)
}

/// Returns (module path, raw type, name without index, name with index).
fn resource_identity(change: &Value) -> Option<(Option<String>, String, String, String)> {
    if let (Some(type_), Some(name)) = (get_str(change, "type"), get_str(change, "name")) {
        let raw_type = qualified_type(get_str(change, "mode"), type_);
        let module = get_str(change, "module_address").map(str::to_string);
        let full_name = match change.get("index") {
            Some(Value::Number(n)) => format!("{}[{}]", name, n),
            Some(Value::String(s)) => format!("{}[\"{}\"]", name, s),
            _ => name.to_string(),
        };
        return Some((module, raw_type, name.to_string(), full_name));
    }

    match parse_address(get_str(change, "address")?)? {
        TfAddress::Resource {
            module,
            raw_type,
            name,
        } => {
            let base = strip_index(&name).to_string();
            Some((module, raw_type, base, name))
        }
        TfAddress::Module(_) => None,
    }
}

fn qualified_type(mode: Option<&str>, type_: &str) -> String {
    if mode == Some("data") {
        format!("data.{}", type_)
    } else {
        type_.to_string()
    }
}

fn scan_attributes(attributes: &Map<String, Value>, out: &mut BTreeSet<String>) {
    for value in attributes.values() {
        scan_value(value, out);
    }
}

fn scan_value(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => out.extend(find_addresses(s)),
        Value::Array(items) => items.iter().for_each(|v| scan_value(v, out)),
        Value::Object(map) => map.values().for_each(|v| scan_value(v, out)),
        _ => {}
    }
}

/// Find every `<type>.<name>` shaped substring of `text`.
pub fn find_addresses(text: &str) -> Vec<String> {
    ADDRESS_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parse a Terraform address or reference expression.
///
/// Returns `None` for things that cannot name a resource (`var.x`,
/// `local.y`, module outputs, ...).
pub fn parse_address(text: &str) -> Option<TfAddress> {
    let text = text.trim().trim_start_matches("${").trim_end_matches('}');
    let segments = split_address(text);

    let mut i = 0;
    let mut modules = Vec::new();
    while i + 1 < segments.len() && segments[i] == "module" {
        modules.push(format!("module.{}", segments[i + 1]));
        i += 2;
    }
    let module = if modules.is_empty() {
        None
    } else {
        Some(modules.join("."))
    };

    match &segments[i..] {
        [] => module.map(TfAddress::Module),
        [data, type_, name, ..] if data == "data" && is_resource_type(type_) => {
            Some(TfAddress::Resource {
                module,
                raw_type: format!("data.{}", type_),
                name: name.clone(),
            })
        }
        [type_, name, ..] if is_resource_type(type_) => Some(TfAddress::Resource {
            module,
            raw_type: type_.clone(),
            name: name.clone(),
        }),
        _ => None,
    }
}

fn is_resource_type(segment: &str) -> bool {
    RESOURCE_TYPE_REGEX.is_match(segment)
}

/// Split on `.` outside of index brackets and quoted keys.
fn split_address(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quotes = false;

    for c in text.chars() {
        match c {
            '"' if depth > 0 => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '[' if !in_quotes => {
                depth += 1;
                current.push(c);
            }
            ']' if !in_quotes => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '.' if depth == 0 && !in_quotes => {
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// `web[0]` -> `web`
pub fn strip_index(name: &str) -> &str {
    name.split_once('[').map(|(base, _)| base).unwrap_or(name)
}

fn get_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key)?.as_str()
}

fn string_array(value: Option<&Value>) -> impl Iterator<Item = String> + '_ {
    value
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str().map(str::to_string))
}
