use serde::{Deserialize, Serialize};

use super::resource::Resource;

/// An egress rule of a security group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    pub protocol: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A security group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecurityGroup {
    pub guid: String,
    pub name: String,
    pub rules: Vec<SecurityGroupRule>,
    pub running_default: bool,
    pub staging_default: bool,
}

#[derive(Deserialize)]
pub(crate) struct SecurityGroupEntity {
    name: String,
    #[serde(default)]
    rules: Option<Vec<SecurityGroupRule>>,
    #[serde(default)]
    running_default: bool,
    #[serde(default)]
    staging_default: bool,
}

impl From<Resource<SecurityGroupEntity>> for SecurityGroup {
    fn from(resource: Resource<SecurityGroupEntity>) -> Self {
        let entity = resource.entity;
        Self {
            guid: resource.metadata.guid,
            name: entity.name,
            rules: entity.rules.unwrap_or_default(),
            running_default: entity.running_default,
            staging_default: entity.staging_default,
        }
    }
}
