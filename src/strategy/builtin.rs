use crate::strategy::{split_list, Strategy};
use crate::utils::local_hostname;
use crate::Context;
use ipnet::IpNet;
use std::collections::HashMap;
use std::net::IpAddr;

const USER_IDS_PARAM: &str = "userIds";
const IPS_PARAM: &str = "IPs";
const HOST_NAMES_PARAM: &str = "hostNames";

/// Active for every request.
pub struct DefaultStrategy {}

impl Strategy for DefaultStrategy {
    fn name(&self) -> &str {
        "default"
    }

    fn is_enabled(&self, _: &str, _: &HashMap<String, String>, _: &Context) -> bool {
        true
    }
}

/// Active when the context's user id is listed in the `userIds` parameter.
pub struct UserWithIdStrategy {}

impl Strategy for UserWithIdStrategy {
    fn name(&self) -> &str {
        "userWithId"
    }

    fn is_enabled(&self, _: &str, parameters: &HashMap<String, String>, context: &Context) -> bool {
        let (Some(user_id), Some(user_ids)) = (context.get_user_id(), parameters.get(USER_IDS_PARAM))
        else {
            return false;
        };
        split_list(user_ids).any(|id| id == user_id)
    }
}

/// Active when the context's remote address matches an address or CIDR range in the `IPs` parameter.
pub struct RemoteAddressStrategy {}

impl Strategy for RemoteAddressStrategy {
    fn name(&self) -> &str {
        "remoteAddress"
    }

    fn is_enabled(&self, _: &str, parameters: &HashMap<String, String>, context: &Context) -> bool {
        let (Some(remote), Some(ips)) = (context.get_remote_address(), parameters.get(IPS_PARAM))
        else {
            return false;
        };
        let remote = remote.trim();
        let remote_ip = remote.parse::<IpAddr>().ok();
        split_list(ips).any(|entry| {
            if entry == remote {
                return true;
            }
            match (remote_ip, entry.parse::<IpNet>()) {
                (Some(ip), Ok(net)) => net.contains(&ip),
                _ => false,
            }
        })
    }
}

/// Active when the local hostname is listed in the `hostNames` parameter.
///
/// The hostname is resolved once, when the strategy is created.
pub struct ApplicationHostnameStrategy {
    hostname: Option<String>,
}

impl ApplicationHostnameStrategy {
    /// Creates the strategy for the local host.
    pub fn new() -> Self {
        Self::with_hostname(local_hostname())
    }

    pub(crate) fn with_hostname(hostname: Option<String>) -> Self {
        Self {
            hostname: hostname.map(|h| h.to_lowercase()),
        }
    }
}

impl Default for ApplicationHostnameStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for ApplicationHostnameStrategy {
    fn name(&self) -> &str {
        "applicationHostname"
    }

    fn is_enabled(&self, _: &str, parameters: &HashMap<String, String>, _: &Context) -> bool {
        let (Some(hostname), Some(host_names)) =
            (self.hostname.as_ref(), parameters.get(HOST_NAMES_PARAM))
        else {
            return false;
        };
        split_list(host_names).any(|name| name.to_lowercase() == *hostname)
    }
}
