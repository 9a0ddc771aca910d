//! Typed identifiers
//!
//! Every addressable object in the platform gets its own id type so that
//! a mixer id can never be passed where a track id is expected. Ids are
//! strings on the wire; composite ids use compact `a/b` string forms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Declares a string-backed id newtype with the common trait surface.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Track node within a session
    TrackId
);
string_id!(
    /// Media item placed on a track
    MediaId
);
string_id!(
    /// Mixer node within a session
    MixerId
);
string_id!(
    /// Fixed (hardware) instance node within a session
    FixedId
);
string_id!(
    /// Dynamic (software) instance node within a session
    DynamicId
);
string_id!(
    /// Connection between two node pads
    ConnectionId
);
string_id!(
    /// Parameter of an instance model
    ParameterId
);
string_id!(
    /// Report (metering) channel of an instance model
    ReportId
);
string_id!(
    /// Capability key granting access to a session
    SecureKey
);
string_id!(
    /// Media object in an app's media library
    MediaObjectId
);
string_id!(
    /// Registered app on the platform
    AppId
);
string_id!(
    /// Session within an app
    SessionId
);
string_id!(
    /// Domain (site) on the platform
    DomainId
);
string_id!(
    /// Countable domain resource (CPU, memory, instance slots)
    ResourceId
);

// ============ Composite Ids ============

/// Session id qualified by its owning app, `app/session` on the wire
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppSessionId {
    pub app_id: AppId,
    pub session_id: SessionId,
}

impl AppSessionId {
    pub fn new(app_id: AppId, session_id: SessionId) -> Self {
        Self { app_id, session_id }
    }
}

impl fmt::Display for AppSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_id, self.session_id)
    }
}

impl FromStr for AppSessionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((app, session)) if !app.is_empty() && !session.is_empty() => {
                Ok(Self::new(AppId::from(app), SessionId::from(session)))
            }
            _ => Err(format!("{s:?} is not an app/session id")),
        }
    }
}

/// Media object id qualified by its owning app, `app/object` on the wire
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppMediaObjectId {
    pub app_id: AppId,
    pub object_id: MediaObjectId,
}

impl AppMediaObjectId {
    pub fn new(app_id: AppId, object_id: MediaObjectId) -> Self {
        Self { app_id, object_id }
    }
}

impl fmt::Display for AppMediaObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_id, self.object_id)
    }
}

impl FromStr for AppMediaObjectId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((app, object)) if !app.is_empty() && !object.is_empty() => {
                Ok(Self::new(AppId::from(app), MediaObjectId::from(object)))
            }
            _ => Err(format!("{s:?} is not an app/object media id")),
        }
    }
}

/// Instance model, `manufacturer/name` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelId {
    pub manufacturer: String,
    pub name: String,
}

impl ModelId {
    pub fn new(manufacturer: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            name: name.into(),
        }
    }

    /// Address a concrete hardware unit of this model
    pub fn instance(self, instance: u64) -> FixedInstanceId {
        FixedInstanceId::new(self.manufacturer, self.name, instance)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.manufacturer, self.name)
    }
}

impl FromStr for ModelId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((manufacturer, name)) if !manufacturer.is_empty() && !name.is_empty() => {
                Ok(Self::new(manufacturer, name))
            }
            _ => Err(format!("{s:?} is not a manufacturer/name model id")),
        }
    }
}

/// Physical hardware unit at a domain, `manufacturer/name/instance` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FixedInstanceId {
    pub manufacturer: String,
    pub name: String,
    pub instance: u64,
}

impl FixedInstanceId {
    pub fn new(manufacturer: impl Into<String>, name: impl Into<String>, instance: u64) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            name: name.into(),
            instance,
        }
    }

    /// Model this unit is an instance of
    pub fn model_id(&self) -> ModelId {
        ModelId::new(self.manufacturer.clone(), self.name.clone())
    }
}

impl fmt::Display for FixedInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.manufacturer, self.name, self.instance)
    }
}

impl FromStr for FixedInstanceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut split = s.split('/');
        let manufacturer = split.next().filter(|p| !p.is_empty());
        let name = split.next().filter(|p| !p.is_empty());
        let instance = split.next().and_then(|p| p.parse::<u64>().ok());
        match (manufacturer, name, instance, split.next()) {
            (Some(manufacturer), Some(name), Some(instance), None) => {
                Ok(Self::new(manufacturer, name, instance))
            }
            _ => Err(format!("{s:?} is not a manufacturer/name/instance id")),
        }
    }
}

// Composite ids serialize as their string form

macro_rules! string_form_serde {
    ($name:ident) => {
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_form_serde!(AppSessionId);
string_form_serde!(AppMediaObjectId);
string_form_serde!(ModelId);
string_form_serde!(FixedInstanceId);

// ============ Playback Ids ============

/// One play request issued against a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PlayId(pub u64);

impl PlayId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One render request issued against a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RenderId(pub u64);

impl RenderId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_id_round_trip() {
        let id = AppSessionId::new(AppId::from("studio"), SessionId::from("mix-42"));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"studio/mix-42\"");

        let back: AppSessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_fixed_instance_id_string_form() {
        let id = FixedInstanceId::new("warmlab", "tube-comp", 3);
        assert_eq!(id.to_string(), "warmlab/tube-comp/3");
        assert_eq!(id.model_id().to_string(), "warmlab/tube-comp");

        let back: FixedInstanceId = "warmlab/tube-comp/3".parse().unwrap();
        assert_eq!(back, id);
        assert!("warmlab/tube-comp".parse::<FixedInstanceId>().is_err());
        assert!("warmlab/tube-comp/x".parse::<FixedInstanceId>().is_err());
    }

    #[test]
    fn test_malformed_session_id_rejected() {
        assert!("no-slash".parse::<AppSessionId>().is_err());
        assert!("/missing-app".parse::<AppSessionId>().is_err());
    }
}
