use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON parsing failed. ({0})")]
    Parse(String),
    #[error("Feature set is invalid. ({0})")]
    Invalid(String),
    #[error("JSON serialization failed. ({0})")]
    Serialize(String),
}

/// Describes a feature toggle.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// The unique name of the feature.
    pub name: String,
    /// Free-text description, if the server sent one.
    pub description: Option<String>,
    /// A globally disabled feature is off regardless of its strategies.
    pub enabled: bool,
    /// The activation constraints, in evaluation order (logical OR).
    pub strategies: Vec<ActivationConstraint>,
}

/// A reference to a named strategy along with the parameters it is evaluated with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationConstraint {
    /// Name of the strategy.
    pub name: String,
    /// Strategy parameters. Numeric and boolean wire values are stored in their textual form.
    #[serde(default, deserialize_with = "de_parameters")]
    pub parameters: HashMap<String, String>,
}

impl ActivationConstraint {
    /// Creates a constraint for the strategy called `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            parameters: HashMap::new(),
        }
    }

    /// Adds a parameter to the constraint.
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.parameters.insert(key.to_owned(), value.to_owned());
        self
    }
}

/// An immutable view of every known feature at a point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub features: HashMap<String, Arc<Feature>>,
    pub version: String,
    pub fetch_time: DateTime<Utc>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            features: HashMap::new(),
            version: String::default(),
            fetch_time: DateTime::<Utc>::MIN_UTC,
        }
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        if !self.version.is_empty() && !other.version.is_empty() {
            return self.version == other.version;
        }
        self.version == other.version && self.features == other.features
    }
}

impl Snapshot {
    /// Builds a snapshot from already constructed features.
    pub fn from_features(features: Vec<Feature>, version: &str) -> Result<Self, Error> {
        let mut map = HashMap::with_capacity(features.len());
        for feature in features {
            if feature.name.is_empty() {
                return Err(Error::Invalid("feature without a name".to_owned()));
            }
            if map.contains_key(&feature.name) {
                return Err(Error::Invalid(format!(
                    "duplicate feature name '{}'",
                    feature.name
                )));
            }
            map.insert(feature.name.clone(), Arc::new(feature));
        }
        Ok(Self {
            features: map,
            version: version.to_owned(),
            fetch_time: Utc::now(),
        })
    }

    pub fn with_time(&self, time: DateTime<Utc>) -> Self {
        Self {
            features: self.features.clone(),
            version: self.version.clone(),
            fetch_time: time,
        }
    }

    /// Serializes the snapshot into the backup file format.
    pub fn serialize(&self) -> Result<String, Error> {
        let backup = BackupFile {
            version: self.version.clone(),
            fetch_time: self.fetch_time.timestamp_millis(),
            features: self
                .features
                .iter()
                .map(|(name, feature)| {
                    (
                        name.clone(),
                        BackupFeature {
                            enabled: feature.enabled,
                            description: feature.description.clone(),
                            strategies: feature.strategies.clone(),
                        },
                    )
                })
                .collect(),
        };
        serde_json::to_string(&backup).map_err(|err| Error::Serialize(err.to_string()))
    }
}

#[derive(Deserialize)]
struct FeaturesPayload {
    features: Vec<WireFeature>,
}

#[derive(Deserialize)]
struct WireFeature {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    strategies: Option<Vec<ActivationConstraint>>,
    // Single-strategy form used by old servers.
    #[serde(default)]
    strategy: Option<String>,
    #[serde(default, deserialize_with = "de_parameters")]
    parameters: HashMap<String, String>,
}

impl From<WireFeature> for Feature {
    fn from(wire: WireFeature) -> Self {
        let strategies = match (wire.strategies, wire.strategy) {
            (Some(list), _) if !list.is_empty() => list,
            (_, Some(name)) => vec![ActivationConstraint {
                name,
                parameters: wire.parameters,
            }],
            (list, None) => list.unwrap_or_default(),
        };
        Self {
            name: wire.name,
            description: wire.description,
            enabled: wire.enabled,
            strategies,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupFile {
    version: String,
    fetch_time: i64,
    features: BTreeMap<String, BackupFeature>,
}

#[derive(Serialize, Deserialize)]
struct BackupFeature {
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    strategies: Vec<ActivationConstraint>,
}

fn de_parameters<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<HashMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::String(val) => Some((key, val)),
            serde_json::Value::Null => None,
            other => Some((key, other.to_string())),
        })
        .collect())
}

/// Parses the feature set returned by the toggle server.
pub fn snapshot_from_json(
    json: &str,
    version: &str,
    fetch_time: DateTime<Utc>,
) -> Result<Snapshot, Error> {
    let payload = serde_json::from_str::<FeaturesPayload>(json)
        .map_err(|err| Error::Parse(err.to_string()))?;
    let features = payload.features.into_iter().map(Feature::from).collect();
    let snapshot = Snapshot::from_features(features, version)?;
    Ok(snapshot.with_time(fetch_time))
}

/// Parses the content of a backup file written by [`Snapshot::serialize`].
pub fn snapshot_from_backup(json: &str) -> Result<Snapshot, Error> {
    let backup =
        serde_json::from_str::<BackupFile>(json).map_err(|err| Error::Parse(err.to_string()))?;
    let fetch_time = DateTime::from_timestamp_millis(backup.fetch_time).ok_or_else(|| {
        Error::Parse(format!("Invalid fetch time: '{}'", backup.fetch_time))
    })?;
    let features = backup
        .features
        .into_iter()
        .map(|(name, feature)| Feature {
            name,
            description: feature.description,
            enabled: feature.enabled,
            strategies: feature.strategies,
        })
        .collect();
    let snapshot = Snapshot::from_features(features, backup.version.as_str())?;
    Ok(snapshot.with_time(fetch_time))
}

#[cfg(test)]
mod model_tests {
    use crate::model::feature::{snapshot_from_backup, snapshot_from_json, Snapshot};
    use chrono::{DateTime, Utc};
    use std::str::FromStr;

    static FEATURES_JSON: &str = r#"{"version":1,"features":[
        {"name":"beta","description":"beta feature","enabled":true,"strategies":[
            {"name":"gradualRolloutUserId","parameters":{"percentage":50,"groupId":"beta"}},
            {"name":"userWithId","parameters":{"userIds":"a,b"}}
        ]},
        {"name":"legacy","enabled":false,"strategy":"default","parameters":null},
        {"name":"bare","enabled":true}
    ]}"#;

    #[test]
    fn parse() {
        let snapshot = snapshot_from_json(FEATURES_JSON, "etag-1", Utc::now()).unwrap();
        assert_eq!(snapshot.features.len(), 3);
        assert_eq!(snapshot.version, "etag-1");

        let beta = &snapshot.features["beta"];
        assert!(beta.enabled);
        assert_eq!(beta.description.as_deref(), Some("beta feature"));
        assert_eq!(beta.strategies.len(), 2);
        assert_eq!(beta.strategies[0].name, "gradualRolloutUserId");
        assert_eq!(beta.strategies[0].parameters["percentage"], "50");
        assert_eq!(beta.strategies[1].parameters["userIds"], "a,b");

        let legacy = &snapshot.features["legacy"];
        assert!(!legacy.enabled);
        assert_eq!(legacy.strategies.len(), 1);
        assert_eq!(legacy.strategies[0].name, "default");
        assert!(legacy.strategies[0].parameters.is_empty());

        assert!(snapshot.features["bare"].strategies.is_empty());
    }

    #[test]
    fn parse_invalid() {
        match snapshot_from_json(r#"{"features": [}"#, "", Utc::now()) {
            Ok(_) => panic!(),
            Err(err) => assert!(err.to_string().starts_with("JSON parsing failed.")),
        }
        match snapshot_from_json(r#"{"a":"b"}"#, "", Utc::now()) {
            Ok(_) => panic!(),
            Err(err) => assert_eq!(
                err.to_string(),
                "JSON parsing failed. (missing field `features` at line 1 column 9)"
            ),
        }
        match snapshot_from_json(
            r#"{"features":[{"name":"a","enabled":true},{"name":"a","enabled":false}]}"#,
            "",
            Utc::now(),
        ) {
            Ok(_) => panic!(),
            Err(err) => assert_eq!(
                err.to_string(),
                "Feature set is invalid. (duplicate feature name 'a')"
            ),
        }
        match snapshot_from_json(r#"{"features":[{"name":"","enabled":true}]}"#, "", Utc::now())
        {
            Ok(_) => panic!(),
            Err(err) => assert_eq!(
                err.to_string(),
                "Feature set is invalid. (feature without a name)"
            ),
        }
    }

    #[test]
    fn backup_format() {
        let time: DateTime<Utc> = DateTime::from_str("2023-06-14T15:27:15.844Z").unwrap();
        let snapshot = snapshot_from_json(FEATURES_JSON, "etag-1", time).unwrap();
        let serialized = snapshot.serialize().unwrap();

        let value: serde_json::Value = serde_json::from_str(serialized.as_str()).unwrap();
        assert_eq!(value["version"], "etag-1");
        assert_eq!(value["fetchTime"], 1686756435844i64);
        assert_eq!(value["features"]["beta"]["enabled"], true);
        assert_eq!(
            value["features"]["beta"]["strategies"][1]["name"],
            "userWithId"
        );

        let restored = snapshot_from_backup(serialized.as_str()).unwrap();
        assert_eq!(restored.fetch_time, time);
        assert_eq!(restored.features, snapshot.features);
    }

    #[test]
    fn backup_invalid() {
        match snapshot_from_backup("") {
            Ok(_) => panic!(),
            Err(err) => assert!(err.to_string().starts_with("JSON parsing failed.")),
        }
        match snapshot_from_backup(r#"{"version":"","fetchTime":1,"features":[]}"#) {
            Ok(_) => panic!(),
            Err(err) => assert!(err.to_string().starts_with("JSON parsing failed.")),
        }
    }

    #[test]
    fn identity() {
        let first = snapshot_from_json(FEATURES_JSON, "etag-1", Utc::now()).unwrap();
        let same_tag = snapshot_from_json(r#"{"features":[]}"#, "etag-1", Utc::now()).unwrap();
        let other_tag = snapshot_from_json(FEATURES_JSON, "etag-2", Utc::now()).unwrap();
        assert_eq!(first, same_tag);
        assert_ne!(first, other_tag);

        let untagged = snapshot_from_json(FEATURES_JSON, "", Utc::now()).unwrap();
        let untagged_same = snapshot_from_json(FEATURES_JSON, "", Utc::now()).unwrap();
        let untagged_other = snapshot_from_json(r#"{"features":[]}"#, "", Utc::now()).unwrap();
        assert_eq!(untagged, untagged_same);
        assert_ne!(untagged, untagged_other);
        assert_ne!(untagged, first);

        // Formatting of the body doesn't matter, the parsed features are compared.
        let reformatted = FEATURES_JSON.replace('\n', " ").replace(": ", ":");
        let untagged_reformatted = snapshot_from_json(&reformatted, "", Utc::now()).unwrap();
        assert_eq!(untagged, untagged_reformatted);
        assert_eq!(Snapshot::default(), Snapshot::default());
        assert!(Snapshot::default().features.is_empty());
    }
}
