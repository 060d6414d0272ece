//! Command-line scene graph overrides
//!
//! Arguments of the form `-node:subnode:leaf=value[,value,value]` poke a
//! value into the scene graph by path. The value text is coerced against the
//! target node's declared type by trying, in order, string, float, int,
//! bool, vec3f and vec2i. The first coercion the node accepts wins. When
//! none does the override is dropped without an error.

use crate::foundation::math::{Vec2i, Vec3};

use super::node::{Node, NodeType, NodeValue};

/// One parsed `-path=value` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOverride {
    /// Child names from the scene root to the target node
    pub path: Vec<String>,
    /// Comma-separated value components
    pub values: Vec<String>,
}

type Coercion = fn(&[&str]) -> Option<NodeValue>;

const COERCIONS: [(NodeType, Coercion); 6] = [
    (NodeType::String, coerce_string),
    (NodeType::Float, coerce_float),
    (NodeType::Int, coerce_int),
    (NodeType::Bool, coerce_bool),
    (NodeType::Vec3f, coerce_vec3f),
    (NodeType::Vec2i, coerce_vec2i),
];

impl NodeOverride {
    /// Parse a single argument
    ///
    /// Returns `None` for anything that is not an override: long options,
    /// arguments without `=`, and single-letter keys (those are short
    /// flags such as `-r=headlight`).
    pub fn parse(arg: &str) -> Option<Self> {
        let body = arg.strip_prefix('-')?;
        if body.starts_with('-') {
            return None;
        }
        let (key, value) = body.split_once('=')?;
        if key.chars().count() < 2 || key.chars().any(char::is_whitespace) {
            return None;
        }
        let path: Vec<String> = key.split(':').map(str::to_string).collect();
        if path.iter().any(String::is_empty) {
            return None;
        }
        let values = value.split(',').map(|v| v.trim().to_string()).collect();
        Some(Self { path, values })
    }

    /// Apply to a scene graph rooted at `root`
    ///
    /// Returns the type that was accepted, or `None` when the path does not
    /// resolve or no coercion matched.
    pub fn apply(&self, root: &mut Node) -> Option<NodeType> {
        let Some(node) = root.find_mut(&self.path) else {
            log::debug!("Ignoring override for unknown node '{}'", self.path.join(":"));
            return None;
        };
        let parts: Vec<&str> = self.values.iter().map(String::as_str).collect();

        for (node_type, coerce) in COERCIONS {
            if let Some(value) = coerce(&parts) {
                if node.set_value(value).is_ok() {
                    log::info!("Override {} = {} ({node_type})", self.path.join(":"), self.values.join(","));
                    return Some(node_type);
                }
            }
        }
        log::debug!(
            "Ignoring override {}={}: no coercion matches {}",
            self.path.join(":"),
            self.values.join(","),
            node.node_type()
        );
        None
    }
}

/// Separate override arguments from the rest of the command line
///
/// Everything after a bare `--` is passed through untouched.
pub fn split_overrides<I>(args: I) -> (Vec<NodeOverride>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut overrides = Vec::new();
    let mut rest = Vec::new();
    let mut passthrough = false;

    for arg in args {
        if passthrough {
            rest.push(arg);
            continue;
        }
        if arg == "--" {
            passthrough = true;
            rest.push(arg);
            continue;
        }
        match NodeOverride::parse(&arg) {
            Some(o) => overrides.push(o),
            None => rest.push(arg),
        }
    }
    (overrides, rest)
}

fn coerce_string(parts: &[&str]) -> Option<NodeValue> {
    Some(NodeValue::String(parts.join(",")))
}

fn coerce_float(parts: &[&str]) -> Option<NodeValue> {
    match parts {
        [v] => v.parse().ok().map(NodeValue::Float),
        _ => None,
    }
}

fn coerce_int(parts: &[&str]) -> Option<NodeValue> {
    match parts {
        [v] => v.parse().ok().map(NodeValue::Int),
        _ => None,
    }
}

fn coerce_bool(parts: &[&str]) -> Option<NodeValue> {
    match parts {
        [v] => match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "on" => Some(NodeValue::Bool(true)),
            "false" | "0" | "off" => Some(NodeValue::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_vec3f(parts: &[&str]) -> Option<NodeValue> {
    match parts {
        [x, y, z] => Some(NodeValue::Vec3f(Vec3::new(x.parse().ok()?, y.parse().ok()?, z.parse().ok()?))),
        _ => None,
    }
}

fn coerce_vec2i(parts: &[&str]) -> Option<NodeValue> {
    match parts {
        [x, y] => Some(NodeValue::Vec2i(Vec2i::new(x.parse().ok()?, y.parse().ok()?))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Node {
        Node::group("renderer")
            .with_child(Node::leaf("type", NodeValue::String("headlight".into())))
            .with_child(Node::leaf("ambient", NodeValue::Float(0.2)))
            .with_child(Node::leaf("workers", NodeValue::Int(0)))
            .with_child(Node::leaf("ground", NodeValue::Bool(true)))
            .with_child(
                Node::group("camera")
                    .with_child(Node::leaf("position", NodeValue::Vec3f(Vec3::zeros()))),
            )
            .with_child(Node::leaf("tiles", NodeValue::Vec2i(Vec2i::new(1, 1))))
    }

    #[test]
    fn test_parse_recognizes_override_syntax() {
        let o = NodeOverride::parse("-camera:position=1,2.5,-3").unwrap();
        assert_eq!(o.path, vec!["camera", "position"]);
        assert_eq!(o.values, vec!["1", "2.5", "-3"]);

        assert_eq!(NodeOverride::parse("--renderer=x"), None);
        assert_eq!(NodeOverride::parse("-r=x"), None);
        assert_eq!(NodeOverride::parse("-camera"), None);
        assert_eq!(NodeOverride::parse("model.obj"), None);
        assert_eq!(NodeOverride::parse("-camera::position=1"), None);
    }

    #[test]
    fn test_first_matching_coercion_wins() {
        let mut root = tree();
        let apply = |root: &mut Node, arg: &str| NodeOverride::parse(arg).unwrap().apply(root);

        assert_eq!(apply(&mut root, "-type=normals"), Some(NodeType::String));
        assert_eq!(apply(&mut root, "-ambient=0.5"), Some(NodeType::Float));
        assert_eq!(apply(&mut root, "-workers=4"), Some(NodeType::Int));
        assert_eq!(apply(&mut root, "-ground=false"), Some(NodeType::Bool));
        assert_eq!(apply(&mut root, "-camera:position=1,2,3"), Some(NodeType::Vec3f));
        assert_eq!(apply(&mut root, "-tiles=4,2"), Some(NodeType::Vec2i));

        assert_eq!(root.get_str(&["type"]).unwrap(), "normals");
        assert_eq!(root.get_f32(&["ambient"]).unwrap(), 0.5);
        assert_eq!(root.get_i32(&["workers"]).unwrap(), 4);
        assert!(!root.get_bool(&["ground"]).unwrap());
        assert_eq!(root.get_vec3(&["camera", "position"]).unwrap(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_float_node_accepts_integer_text() {
        let mut root = tree();
        let o = NodeOverride::parse("-ambient=1").unwrap();
        assert_eq!(o.apply(&mut root), Some(NodeType::Float));
        assert_eq!(root.get_f32(&["ambient"]).unwrap(), 1.0);
    }

    #[test]
    fn test_unparseable_override_is_ignored() {
        let mut root = tree();
        for arg in ["-ambient=bright", "-camera:position=1,2", "-workers=many", "-nothing:here=1"] {
            assert_eq!(NodeOverride::parse(arg).unwrap().apply(&mut root), None, "{arg}");
        }
        assert_eq!(root.get_f32(&["ambient"]).unwrap(), 0.2);
    }

    #[test]
    fn test_split_overrides_keeps_other_args() {
        let args = ["pano360", "-camera:position=0,1,0", "--fullscreen", "scene.obj", "-r", "normals"]
            .map(String::from);
        let (overrides, rest) = split_overrides(args);
        assert_eq!(overrides.len(), 1);
        assert_eq!(rest, vec!["pano360", "--fullscreen", "scene.obj", "-r", "normals"]);
    }
}
