//! Layer merge
//!
//! - Mappings merge key by key (so a file `profiles` table extends, never
//!   wipes, another layer's table)
//! - Everything else: the higher layer replaces the lower one
//! - An explicit `null` replaces too; lookups read it as "unset"

use serde_json::Value;

/// Merge `overlay` on top of `base`.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Fold layers in precedence order; the last layer wins.
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers
        .into_iter()
        .fold(Value::Object(Default::default()), deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_later_layer_wins() {
        let defaults = json!({"configuration": "Debug", "sdk": "iphoneos"});
        let file = json!({"configuration": "Release", "scheme": "App"});
        let cli = json!({"configuration": "AdHoc"});

        let result = merge_layers(vec![defaults, file, cli]);

        assert_eq!(result["configuration"], "AdHoc");
        assert_eq!(result["scheme"], "App");
        assert_eq!(result["sdk"], "iphoneos");
    }

    #[test]
    fn test_profiles_merge_by_key() {
        let base = json!({"profiles": {"Debug": "dev.mobileprovision"}});
        let overlay = json!({"profiles": {"Release": "dist.mobileprovision"}});

        let result = deep_merge(base, overlay);

        assert_eq!(result["profiles"]["Debug"], "dev.mobileprovision");
        assert_eq!(result["profiles"]["Release"], "dist.mobileprovision");
    }

    #[test]
    fn test_null_clears_default() {
        let result = deep_merge(json!({"configuration": "Debug"}), json!({"configuration": null}));
        assert!(result["configuration"].is_null());
    }

    #[test]
    fn test_no_layers() {
        assert_eq!(merge_layers(vec![]), json!({}));
    }
}
