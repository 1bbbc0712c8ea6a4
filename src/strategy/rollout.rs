//! Percentage based rollout strategies.
//!
//! A request is placed into one of 100 buckets. For the session and user id variants the
//! bucket is `murmur3_32("{groupId}:{id}", seed = 0) % 100`, which is stable across processes
//! and client instances. The feature is active iff `bucket < percentage`, so raising the
//! percentage only ever adds buckets.

use crate::strategy::Strategy;
use crate::Context;
use murmur3::murmur3_32;
use rand::Rng;
use std::collections::HashMap;
use std::io::Cursor;

const PERCENTAGE_PARAM: &str = "percentage";
const GROUP_ID_PARAM: &str = "groupId";
const BUCKETS: u32 = 100;

/// Returns the bucket in `[0, 100)` of `id` within `group_id`.
pub fn normalized_value(id: &str, group_id: &str) -> u32 {
    let input = format!("{group_id}:{id}");
    murmur3_32(&mut Cursor::new(input.as_bytes()), 0).unwrap_or(0) % BUCKETS
}

pub(crate) fn percentage(parameters: &HashMap<String, String>) -> u32 {
    parameters
        .get(PERCENTAGE_PARAM)
        .and_then(|p| p.trim().parse::<f64>().ok())
        .filter(|p| p.is_finite())
        .map(|p| p.clamp(0.0, BUCKETS as f64) as u32)
        .unwrap_or(0)
}

fn group_id<'a>(feature: &'a str, parameters: &'a HashMap<String, String>) -> &'a str {
    parameters
        .get(GROUP_ID_PARAM)
        .map(String::as_str)
        .filter(|g| !g.is_empty())
        .unwrap_or(feature)
}

fn rollout(id: Option<&str>, feature: &str, parameters: &HashMap<String, String>) -> bool {
    let Some(id) = id.filter(|id| !id.is_empty()) else {
        return false;
    };
    let percentage = percentage(parameters);
    percentage > 0 && normalized_value(id, group_id(feature, parameters)) < percentage
}

/// Rolls out to a percentage of users, keyed by the context's user id.
pub struct GradualRolloutUserId {}

impl Strategy for GradualRolloutUserId {
    fn name(&self) -> &str {
        "gradualRolloutUserId"
    }

    fn is_enabled(
        &self,
        feature: &str,
        parameters: &HashMap<String, String>,
        context: &Context,
    ) -> bool {
        rollout(context.get_user_id(), feature, parameters)
    }
}

/// Rolls out to a percentage of sessions, keyed by the context's session id.
pub struct GradualRolloutSessionId {}

impl Strategy for GradualRolloutSessionId {
    fn name(&self) -> &str {
        "gradualRolloutSessionId"
    }

    fn is_enabled(
        &self,
        feature: &str,
        parameters: &HashMap<String, String>,
        context: &Context,
    ) -> bool {
        rollout(context.get_session_id(), feature, parameters)
    }
}

/// Rolls out to a percentage of evaluations, picking a random bucket each time.
pub struct GradualRolloutRandom {}

impl Strategy for GradualRolloutRandom {
    fn name(&self) -> &str {
        "gradualRolloutRandom"
    }

    fn is_enabled(&self, _: &str, parameters: &HashMap<String, String>, _: &Context) -> bool {
        let percentage = percentage(parameters);
        percentage > 0 && rand::rng().random_range(0..BUCKETS) < percentage
    }
}

#[cfg(test)]
mod rollout_tests {
    use crate::strategy::rollout::*;

    fn params(percentage: &str) -> HashMap<String, String> {
        HashMap::from([(PERCENTAGE_PARAM.to_owned(), percentage.to_owned())])
    }

    #[test]
    fn known_buckets() {
        assert_eq!(normalized_value("123", "gr1"), 72);
        assert_eq!(normalized_value("999", "gr1"), 36);
        assert_eq!(normalized_value("user-1", "beta"), 66);
        assert_eq!(normalized_value("user-3", "beta"), 37);
        assert_eq!(normalized_value("session-42", "checkout"), 22);
    }

    #[test]
    fn percentage_parsing() {
        assert_eq!(percentage(&params("50")), 50);
        assert_eq!(percentage(&params(" 25 ")), 25);
        assert_eq!(percentage(&params("33.7")), 33);
        assert_eq!(percentage(&params("150")), 100);
        assert_eq!(percentage(&params("-5")), 0);
        assert_eq!(percentage(&params("abc")), 0);
        assert_eq!(percentage(&HashMap::new()), 0);
    }

    #[test]
    fn user_id_rollout() {
        let strategy = GradualRolloutUserId {};
        let ctx = Context::new().user_id("user-3");

        // bucket 37
        assert!(strategy.is_enabled("beta", &params("38"), &ctx));
        assert!(!strategy.is_enabled("beta", &params("37"), &ctx));
        assert!(strategy.is_enabled("beta", &params("100"), &ctx));
        assert!(!strategy.is_enabled("beta", &params("0"), &ctx));
        assert!(!strategy.is_enabled("beta", &params("100"), &Context::new()));
    }

    #[test]
    fn group_id_overrides_feature_name() {
        let strategy = GradualRolloutUserId {};
        let mut p = params("73");
        p.insert(GROUP_ID_PARAM.to_owned(), "gr1".to_owned());

        // bucket 72 in "gr1"
        assert!(strategy.is_enabled("any-feature", &p, &Context::new().user_id("123")));
        p.insert(PERCENTAGE_PARAM.to_owned(), "72".to_owned());
        assert!(!strategy.is_enabled("any-feature", &p, &Context::new().user_id("123")));
    }

    #[test]
    fn session_id_rollout() {
        let strategy = GradualRolloutSessionId {};
        let ctx = Context::new().session_id("session-42").user_id("user-3");

        // bucket 22
        assert!(strategy.is_enabled("checkout", &params("23"), &ctx));
        assert!(!strategy.is_enabled("checkout", &params("22"), &ctx));
        assert!(!strategy.is_enabled("checkout", &params("100"), &Context::new().user_id("u")));
    }

    #[test]
    fn random_rollout_bounds() {
        let strategy = GradualRolloutRandom {};
        let ctx = Context::new();
        for _ in 0..1000 {
            assert!(strategy.is_enabled("f", &params("100"), &ctx));
            assert!(!strategy.is_enabled("f", &params("0"), &ctx));
        }
    }
}
