use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::catalog::loader::{ResolvedResource, TypeLoader};
use crate::cli::{OutputFormat, BASE_DIR_ENV};
use crate::core::reference::{TypeGraph, TypeRef};
use crate::core::types::{ObjectProperty, PropertyFlags, TypeBase};

/// Anonymous types are expanded inline up to this depth; cycles stop here too
const MAX_LABEL_DEPTH: usize = 3;

#[derive(Args)]
pub struct ShowArgs {
    /// Fully-qualified resource type (e.g. "Microsoft.Storage/storageAccounts")
    #[arg(required = true)]
    pub resource_type: String,

    /// API version (e.g. "2021-01-01")
    #[arg(required = true)]
    pub api_version: String,

    /// Catalog directory containing index.json
    #[arg(long, env = BASE_DIR_ENV)]
    pub base_dir: PathBuf,
}

#[derive(Serialize)]
struct PropertyView {
    name: String,
    #[serde(rename = "type")]
    type_label: String,
    flags: Vec<&'static str>,
}

#[derive(Serialize)]
struct ResourceView {
    name: String,
    api_version: String,
    body: String,
    properties: Vec<PropertyView>,
}

pub fn run(args: ShowArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let loader = TypeLoader::from_dir(&args.base_dir);
    let resolved = loader
        .resolve(&args.resource_type, &args.api_version)?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Resource type '{}@{}' not found in catalog",
                args.resource_type,
                args.api_version
            )
        })?;

    if verbose {
        eprintln!(
            "Resolved from chunk with {} types (record {})",
            resolved.graph().len(),
            resolved.handle().index()
        );
    }

    let view = resource_view(&resolved, &args.api_version);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Text => {
            println!("{}@{}", view.name, view.api_version);
            println!("  body: {}", view.body);
            for property in &view.properties {
                let flags = if property.flags.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", property.flags.join(", "))
                };
                println!("  {}: {}{}", property.name, property.type_label, flags);
            }
        }
    }

    Ok(())
}

fn resource_view(resolved: &ResolvedResource, api_version: &str) -> ResourceView {
    let graph = resolved.graph();
    let body = resolved.resource().body;

    let properties = match resolved.body() {
        TypeBase::Object(object) => property_views(graph, object.properties.iter()),
        TypeBase::DiscriminatedObject(object) => {
            property_views(graph, object.base_properties.iter())
        }
        _ => Vec::new(),
    };

    ResourceView {
        name: resolved.name().to_string(),
        api_version: api_version.to_string(),
        body: type_label(graph, body, 0),
        properties,
    }
}

fn property_views<'a>(
    graph: &TypeGraph,
    properties: impl Iterator<Item = (&'a String, &'a ObjectProperty)>,
) -> Vec<PropertyView> {
    properties
        .map(|(name, property)| PropertyView {
            name: name.clone(),
            type_label: type_label(graph, property.type_ref, 1),
            flags: flag_names(property.flags),
        })
        .collect()
}

fn flag_names(flags: PropertyFlags) -> Vec<&'static str> {
    [
        (PropertyFlags::REQUIRED, "required"),
        (PropertyFlags::READ_ONLY, "read-only"),
        (PropertyFlags::WRITE_ONLY, "write-only"),
        (PropertyFlags::DEPLOY_TIME_CONSTANT, "deploy-time constant"),
    ]
    .into_iter()
    .filter(|(flag, _)| flags.contains(*flag))
    .map(|(_, name)| name)
    .collect()
}

/// Short human-readable description of a type. Named types print their name;
/// anonymous ones are expanded until `MAX_LABEL_DEPTH`.
fn type_label(graph: &TypeGraph, handle: TypeRef, depth: usize) -> String {
    let Some(node) = graph.get(handle) else {
        return format!("<missing {handle}>");
    };
    if let Some(name) = node.name() {
        return name.to_string();
    }
    if depth >= MAX_LABEL_DEPTH {
        return "...".to_string();
    }

    match node {
        TypeBase::BuiltIn(builtin) => builtin.kind.to_string(),
        TypeBase::StringLiteral(literal) => format!("'{}'", literal.value),
        TypeBase::Array(array) => format!("{}[]", type_label(graph, array.item_type, depth + 1)),
        TypeBase::Union(union) => union
            .elements
            .iter()
            .map(|&element| type_label(graph, element, depth + 1))
            .collect::<Vec<_>>()
            .join(" | "),
        TypeBase::Object(object) => match object.additional_properties {
            Some(values) if object.properties.is_empty() => {
                format!("dictionary<{}>", type_label(graph, values, depth + 1))
            }
            _ => format!("object ({} properties)", object.properties.len()),
        },
        TypeBase::DiscriminatedObject(_) | TypeBase::Resource(_) => node.kind_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reference::TypeFactory;
    use crate::core::types::{ArrayType, BuiltInTypeKind, ObjectType};

    #[test]
    fn test_type_label() {
        let mut factory = TypeFactory::new();
        let string = factory.builtin(BuiltInTypeKind::String);
        let a = factory.create(TypeBase::string_literal("a"));
        let b = factory.create(TypeBase::string_literal("b"));
        let union = factory.create(TypeBase::union(vec![a, b]));
        let list = factory.create(TypeBase::Array(ArrayType::of(union)));
        let tags = factory.create(TypeBase::Object(ObjectType::dictionary(string)));
        let named = factory.create(TypeBase::Object(ObjectType::new("Props")));
        let cyclic = factory.reserve();
        factory
            .define(cyclic, TypeBase::Array(ArrayType::of(cyclic)))
            .unwrap();
        let graph = factory.finish().unwrap();

        assert_eq!(type_label(&graph, list, 0), "'a' | 'b'[]");
        assert_eq!(type_label(&graph, tags, 0), "dictionary<string>");
        assert_eq!(type_label(&graph, named, 0), "Props");
        assert_eq!(type_label(&graph, cyclic, 0), "...[][][]");
    }

    #[test]
    fn test_flag_names() {
        assert_eq!(
            flag_names(PropertyFlags::REQUIRED | PropertyFlags::READ_ONLY),
            ["required", "read-only"]
        );
        assert!(flag_names(PropertyFlags::empty()).is_empty());
    }
}
