// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

use std::net::IpAddr;

use crate::protocol::KissOfDeath;

use super::IpNet;

/// Result of an access control check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccessResult {
    /// Request is allowed.
    Allow,
    /// Client matches the deny list: answer with KoD DENY.
    Deny,
    /// Client is not on the allow list: answer with KoD RSTR.
    Restrict,
}

impl AccessResult {
    /// The kiss code to answer a refused client with, if any.
    pub fn kiss_code(&self) -> Option<KissOfDeath> {
        match self {
            AccessResult::Allow => None,
            AccessResult::Deny => Some(KissOfDeath::Deny),
            AccessResult::Restrict => Some(KissOfDeath::Rstr),
        }
    }
}

/// IP-based access control lists for the NTP server.
///
/// If a deny list is configured, any matching client receives a KoD DENY.
/// If an allow list is configured, non-matching clients receive a KoD RSTR.
/// If neither list is configured, all clients are allowed.
#[derive(Clone, Debug, Default)]
pub struct AccessControl {
    allow_list: Option<Vec<IpNet>>,
    deny_list: Option<Vec<IpNet>>,
}

impl AccessControl {
    /// Create an access control with optional allow and deny lists.
    pub fn new(allow_list: Option<Vec<IpNet>>, deny_list: Option<Vec<IpNet>>) -> Self {
        AccessControl {
            allow_list,
            deny_list,
        }
    }

    /// Whether any list is configured.
    pub fn is_restricted(&self) -> bool {
        self.allow_list.is_some() || self.deny_list.is_some()
    }

    /// Check whether the given client IP is allowed.
    pub fn check(&self, client_ip: &IpAddr) -> AccessResult {
        // Deny list checked first.
        if let Some(deny) = &self.deny_list
            && deny.iter().any(|net| net.contains(client_ip))
        {
            return AccessResult::Deny;
        }
        if let Some(allow) = &self.allow_list
            && !allow.iter().any(|net| net.contains(client_ip))
        {
            return AccessResult::Restrict;
        }
        AccessResult::Allow
    }
}
