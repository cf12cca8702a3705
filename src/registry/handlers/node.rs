use serde_json::json;

use super::payload;
use crate::command::Arguments;
use crate::error::CommandError;
use crate::host::{Host, NodePath};
use crate::registry::params::{
    CreateNodeParams, DeleteNodeParams, ListNodesParams, NodePathParams, UpdateNodePropertyParams,
};
use crate::registry::validation;
use crate::registry::{CommandFamily, CommandHandler};
use crate::value::NativeValue;

enum NodeRequest {
    Create {
        class: String,
        parent: NodePath,
        name: String,
    },
    Delete {
        path: NodePath,
    },
    Update {
        path: NodePath,
        property: String,
        value: NativeValue,
    },
    Properties {
        path: NodePath,
    },
    List {
        parent: NodePath,
    },
}

impl NodeRequest {
    fn parse(command_type: &str, args: &Arguments) -> Result<Self, CommandError> {
        match command_type {
            "create_node" => {
                let p: CreateNodeParams = args.parse()?;
                let class = validation::identifier(&p.node_type, "type")?.to_string();
                let parent = match validation::optional(p.parent_path.as_deref()) {
                    Some(raw) => validation::node_path(raw, "parent_path")?,
                    None => NodePath::root(),
                };
                let name = match validation::optional(p.name.as_deref()) {
                    Some(raw) => validation::node_name(raw, "name")?.to_string(),
                    None => class.clone(),
                };
                Ok(Self::Create {
                    class,
                    parent,
                    name,
                })
            }
            "delete_node" => {
                let p: DeleteNodeParams = args.parse()?;
                let path = validation::node_path(&p.path, "path")?;
                if path.is_root() {
                    return Err(CommandError::invalid_argument(
                        "Cannot delete the scene root",
                    ));
                }
                Ok(Self::Delete { path })
            }
            "update_node_property" => {
                let p: UpdateNodePropertyParams = args.parse()?;
                let path = validation::node_path(&p.path, "path")?;
                let property = validation::non_empty(&p.property, "property")?.to_string();
                Ok(Self::Update {
                    path,
                    property,
                    value: p.value,
                })
            }
            "get_node_properties" => {
                let p: NodePathParams = args.parse()?;
                let path = validation::node_path(&p.path, "path")?;
                Ok(Self::Properties { path })
            }
            "list_nodes" => {
                let p: ListNodesParams = args.parse()?;
                let parent = match validation::optional(p.path.as_deref()) {
                    Some(raw) => validation::node_path(raw, "path")?,
                    None => NodePath::root(),
                };
                Ok(Self::List { parent })
            }
            other => Err(CommandError::unknown_command(other)),
        }
    }
}

/// Node operations. Argument shape is checked up front; whether a node or
/// class actually exists is the host's call and surfaces as a host failure.
pub struct NodeHandler;

impl CommandHandler for NodeHandler {
    fn family(&self) -> CommandFamily {
        CommandFamily::Node
    }

    fn validate(
        &self,
        command_type: &str,
        args: &Arguments,
        _host: &dyn Host,
    ) -> Result<(), CommandError> {
        NodeRequest::parse(command_type, args).map(drop)
    }

    fn execute(
        &self,
        command_type: &str,
        args: &Arguments,
        host: &mut dyn Host,
    ) -> Result<NativeValue, CommandError> {
        match NodeRequest::parse(command_type, args)? {
            NodeRequest::Create {
                class,
                parent,
                name,
            } => {
                let path = host.instantiate(&parent, &class, &name)?;
                Ok(json!({
                    "path": path,
                    "name": path.name(),
                    "type": class,
                    "parent": parent,
                })
                .into())
            }
            NodeRequest::Delete { path } => {
                host.free_node(&path)?;
                Ok(json!({ "deleted": path }).into())
            }
            NodeRequest::Update {
                path,
                property,
                value,
            } => {
                let previous = host.set_property(&path, &property, value)?;
                let node = host.node(&path)?;
                let current = node.properties.get(&property).cloned().unwrap_or_default();
                payload(&json!({
                    "path": path,
                    "property": property,
                    "previous": previous,
                    "value": current,
                }))
            }
            NodeRequest::Properties { path } => {
                let node = host.node(&path)?;
                payload(&json!({
                    "path": node.path,
                    "name": node.name,
                    "type": node.class,
                    "properties": node.properties,
                }))
            }
            NodeRequest::List { parent } => list_nodes(host, &parent),
        }
    }
}

fn list_nodes(host: &dyn Host, parent: &NodePath) -> Result<NativeValue, CommandError> {
    let info = host.node(parent)?;
    let nodes = info
        .children
        .iter()
        .map(|name| {
            let child = host.node(&parent.join(name))?;
            Ok(json!({
                "name": child.name,
                "type": child.class,
                "path": child.path,
                "child_count": child.children.len(),
            }))
        })
        .collect::<Result<Vec<_>, CommandError>>()?;
    Ok(json!({
        "parent": parent,
        "count": nodes.len(),
        "nodes": nodes,
    })
    .into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::handlers::test_support::{
        args, err_kind, ok_map, project, project_with_scene, run,
    };
    use crate::value::Mapping;

    #[test]
    fn create_node_defaults_to_root_and_type_name() {
        let (_dir, mut host) = project_with_scene();
        let result = ok_map(run(
            &NodeHandler,
            "create_node",
            &args(&[("type", "Sprite2D".into())]),
            &mut host,
        ));
        assert_eq!(result["path"], NativeValue::from("/root/Sprite2D"));
        assert_eq!(result["parent"], NativeValue::from("/root"));
        assert_eq!(result["type"], NativeValue::from("Sprite2D"));
    }

    #[test]
    fn create_node_blank_optional_fields_are_absent() {
        let (_dir, mut host) = project_with_scene();
        let result = ok_map(run(
            &NodeHandler,
            "create_node",
            &args(&[
                ("type", "Timer".into()),
                ("parent_path", "".into()),
                ("name", "".into()),
            ]),
            &mut host,
        ));
        assert_eq!(result["path"], NativeValue::from("/root/Timer"));
    }

    #[test]
    fn create_node_under_nested_parent() {
        let (_dir, mut host) = project_with_scene();
        host.instantiate(&NodePath::root(), "Node2D", "World").unwrap();
        let result = ok_map(run(
            &NodeHandler,
            "create_node",
            &args(&[
                ("type", "Camera2D".into()),
                ("parent_path", "World".into()),
                ("name", "Cam".into()),
            ]),
            &mut host,
        ));
        assert_eq!(result["path"], NativeValue::from("/root/World/Cam"));
        assert_eq!(result["name"], NativeValue::from("Cam"));
    }

    #[test]
    fn create_node_rejects_bad_names() {
        let (_dir, mut host) = project_with_scene();
        let result = run(
            &NodeHandler,
            "create_node",
            &args(&[("type", "Node".into()), ("name", "a/b".into())]),
            &mut host,
        );
        assert_eq!(err_kind(result), ErrorKind::InvalidArgument);
        assert_eq!(host.current_scene().unwrap().node_count, 1);
    }

    #[test]
    fn create_node_without_scene_fails_on_host() {
        let (_dir, mut host) = project();
        let result = run(
            &NodeHandler,
            "create_node",
            &args(&[("type", "Node".into())]),
            &mut host,
        );
        assert_eq!(err_kind(result), ErrorKind::HostOperationFailed);
    }

    #[test]
    fn delete_node_removes_subtree() {
        let (_dir, mut host) = project_with_scene();
        let world = host.instantiate(&NodePath::root(), "Node2D", "World").unwrap();
        host.instantiate(&world, "Sprite2D", "Tree").unwrap();
        let result = ok_map(run(
            &NodeHandler,
            "delete_node",
            &args(&[("path", "/root/World".into())]),
            &mut host,
        ));
        assert_eq!(result["deleted"], NativeValue::from("/root/World"));
        assert_eq!(host.current_scene().unwrap().node_count, 1);
    }

    #[test]
    fn delete_root_is_invalid() {
        let (_dir, mut host) = project_with_scene();
        let result = run(
            &NodeHandler,
            "delete_node",
            &args(&[("path", "/root".into())]),
            &mut host,
        );
        assert_eq!(err_kind(result), ErrorKind::InvalidArgument);
    }

    #[test]
    fn update_property_reports_previous_and_coerced_value() {
        let (_dir, mut host) = project_with_scene();
        let mut position = Mapping::new();
        position.insert("x".into(), NativeValue::Int(4));
        position.insert("y".into(), NativeValue::Int(8));
        let result = ok_map(run(
            &NodeHandler,
            "update_node_property",
            &args(&[
                ("path", "/root".into()),
                ("property", "position".into()),
                ("value", NativeValue::Map(position)),
            ]),
            &mut host,
        ));
        let previous = result["previous"].as_map().unwrap();
        assert_eq!(previous["x"], NativeValue::Float(0.0));
        let value = result["value"].as_map().unwrap();
        assert_eq!(value["x"], NativeValue::Float(4.0));
        assert!(host.current_scene().unwrap().dirty);
    }

    #[test]
    fn update_property_type_mismatch_fails_on_host() {
        let (_dir, mut host) = project_with_scene();
        let result = run(
            &NodeHandler,
            "update_node_property",
            &args(&[
                ("path", "/root".into()),
                ("property", "visible".into()),
                ("value", "maybe".into()),
            ]),
            &mut host,
        );
        assert_eq!(err_kind(result), ErrorKind::HostOperationFailed);
    }

    #[test]
    fn properties_of_missing_node_fail_on_host() {
        let (_dir, mut host) = project_with_scene();
        let result = run(
            &NodeHandler,
            "get_node_properties",
            &args(&[("path", "/root/Ghost".into())]),
            &mut host,
        );
        assert_eq!(err_kind(result), ErrorKind::HostOperationFailed);
    }

    #[test]
    fn properties_include_class_defaults() {
        let (_dir, mut host) = project_with_scene();
        let result = ok_map(run(
            &NodeHandler,
            "get_node_properties",
            &args(&[("path", "/root".into())]),
            &mut host,
        ));
        assert_eq!(result["type"], NativeValue::from("Node2D"));
        let props = result["properties"].as_map().unwrap();
        assert!(props.contains_key("position"));
        assert!(props.contains_key("visible"));
    }

    #[test]
    fn list_nodes_reports_direct_children() {
        let (_dir, mut host) = project_with_scene();
        let world = host.instantiate(&NodePath::root(), "Node2D", "World").unwrap();
        host.instantiate(&world, "Sprite2D", "A").unwrap();
        host.instantiate(&world, "Sprite2D", "B").unwrap();
        host.instantiate(&NodePath::root(), "Timer", "Clock").unwrap();

        let result = ok_map(run(&NodeHandler, "list_nodes", &args(&[]), &mut host));
        assert_eq!(result["count"], NativeValue::Int(2));
        let NativeValue::Array(nodes) = &result["nodes"] else {
            panic!("nodes should be an array");
        };
        let first = nodes[0].as_map().unwrap();
        assert_eq!(first["name"], NativeValue::from("World"));
        assert_eq!(first["child_count"], NativeValue::Int(2));

        let scoped = ok_map(run(
            &NodeHandler,
            "list_nodes",
            &args(&[("path", "/root/World".into())]),
            &mut host,
        ));
        assert_eq!(scoped["count"], NativeValue::Int(2));
    }
}
