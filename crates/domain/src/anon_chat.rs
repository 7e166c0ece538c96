//! 匿名聊天匹配模型
//!
//! 两个等待条目只有在双方的过滤条件都接受对方、且互相没有屏蔽时才能配对。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::rating::{Rating, RATING_MAX, RATING_MIN};
use crate::value_objects::ProfileId;

pub const AGE_MIN: u8 = 0;
pub const AGE_MAX: u8 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "f")]
    Female,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

/// 匹配过滤条件，未设置的字段表示不限制
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Filter {
    pub gender: Option<Gender>,
    pub min_age: Option<u8>,
    pub max_age: Option<u8>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
}

impl Filter {
    pub fn validate(&self) -> DomainResult<()> {
        if self.gender == Some(Gender::Unknown) {
            return Err(DomainError::invalid_argument(
                "filter.gender",
                "must be \"m\" or \"f\"",
            ));
        }
        for (field, age) in [("filter.minAge", self.min_age), ("filter.maxAge", self.max_age)] {
            if age.is_some_and(|age| age > AGE_MAX) {
                return Err(DomainError::invalid_argument(field, "out of range"));
            }
        }
        for (field, rating) in [
            ("filter.minRating", self.min_rating),
            ("filter.maxRating", self.max_rating),
        ] {
            if rating.is_some_and(|r| !(RATING_MIN..=RATING_MAX).contains(&r)) {
                return Err(DomainError::invalid_argument(field, "out of range"));
            }
        }
        if let (Some(min), Some(max)) = (self.min_age, self.max_age) {
            if min > max {
                return Err(DomainError::invalid_argument(
                    "filter.minAge",
                    "must not exceed maxAge",
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.min_rating, self.max_rating) {
            if min > max {
                return Err(DomainError::invalid_argument(
                    "filter.minRating",
                    "must not exceed maxRating",
                ));
            }
        }
        Ok(())
    }

    /// 过滤条件是否接受对方的属性
    pub fn accepts(&self, other: &WaitingEntry) -> bool {
        if let Some(gender) = self.gender {
            if other.gender != gender {
                return false;
            }
        }
        if let Some(min_age) = self.min_age {
            if other.age.is_none_or(|age| age < min_age) {
                return false;
            }
        }
        if let Some(max_age) = self.max_age {
            if other.age.is_none_or(|age| age > max_age) {
                return false;
            }
        }
        let rating = other.rating.value();
        if self.min_rating.is_some_and(|min| rating < min) {
            return false;
        }
        if self.max_rating.is_some_and(|max| rating > max) {
            return false;
        }
        true
    }
}

/// 匹配队列中的一个等待条目
#[derive(Debug, Clone, PartialEq)]
pub struct WaitingEntry {
    pub profile_id: ProfileId,
    pub gender: Gender,
    pub age: Option<u8>,
    pub rating: Rating,
    pub blocked_partners: HashSet<ProfileId>,
    pub filter: Filter,
}

impl WaitingEntry {
    /// 单向检查：自己的条件是否接受 `other`
    fn accepts(&self, other: &WaitingEntry) -> bool {
        self.filter.accepts(other) && !self.blocked_partners.contains(&other.profile_id)
    }

    /// 对称的匹配关系：`a.matches(b) == b.matches(a)`
    pub fn matches(&self, other: &WaitingEntry) -> bool {
        self.profile_id != other.profile_id && self.accepts(other) && other.accepts(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(gender: Gender, age: Option<u8>, rating: f64, filter: Filter) -> WaitingEntry {
        WaitingEntry {
            profile_id: ProfileId::generate(),
            gender,
            age,
            rating: Rating::new(rating),
            blocked_partners: HashSet::new(),
            filter,
        }
    }

    #[test]
    fn open_filters_match_each_other() {
        let a = entry(Gender::Female, None, 0.0, Filter::default());
        let b = entry(Gender::Unknown, Some(30), -3.0, Filter::default());
        assert!(a.matches(&b));
        assert!(b.matches(&a));
    }

    #[test]
    fn gender_filter_is_applied_both_ways() {
        let wants_f = Filter {
            gender: Some(Gender::Female),
            ..Filter::default()
        };
        let a = entry(Gender::Female, None, 0.0, Filter::default());
        let b = entry(Gender::Male, None, 0.0, wants_f.clone());
        let c = entry(Gender::Male, None, 0.0, Filter::default());

        assert!(a.matches(&b));
        assert!(b.matches(&a));
        assert!(!b.matches(&c));
        assert!(!c.matches(&b));
    }

    #[test]
    fn age_bounds_reject_unknown_age() {
        let adults = Filter {
            min_age: Some(18),
            ..Filter::default()
        };
        let picky = entry(Gender::Male, Some(20), 0.0, adults);
        let no_age = entry(Gender::Female, None, 0.0, Filter::default());
        let teen = entry(Gender::Female, Some(16), 0.0, Filter::default());
        let adult = entry(Gender::Female, Some(18), 0.0, Filter::default());

        assert!(!picky.matches(&no_age));
        assert!(!picky.matches(&teen));
        assert!(picky.matches(&adult));
    }

    #[test]
    fn rating_bounds_are_inclusive() {
        let filter = Filter {
            min_rating: Some(-1.0),
            max_rating: Some(1.0),
            ..Filter::default()
        };
        let a = entry(Gender::Male, None, 0.0, filter);
        assert!(a.matches(&entry(Gender::Female, None, 1.0, Filter::default())));
        assert!(!a.matches(&entry(Gender::Female, None, 1.5, Filter::default())));
        assert!(!a.matches(&entry(Gender::Female, None, -2.0, Filter::default())));
    }

    #[test]
    fn block_on_either_side_prevents_match() {
        let mut a = entry(Gender::Male, None, 0.0, Filter::default());
        let b = entry(Gender::Female, None, 0.0, Filter::default());
        a.blocked_partners.insert(b.profile_id);

        assert!(!a.matches(&b));
        assert!(!b.matches(&a));
    }

    #[test]
    fn filter_validation() {
        assert!(Filter::default().validate().is_ok());
        let bad_gender = Filter {
            gender: Some(Gender::Unknown),
            ..Filter::default()
        };
        assert!(bad_gender.validate().is_err());
        let bad_age = Filter {
            max_age: Some(120),
            ..Filter::default()
        };
        assert!(bad_age.validate().is_err());
        let bad_rating = Filter {
            min_rating: Some(-11.0),
            ..Filter::default()
        };
        assert!(bad_rating.validate().is_err());
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let ages = Filter {
            min_age: Some(30),
            max_age: Some(20),
            ..Filter::default()
        };
        assert_eq!(
            ages.validate(),
            Err(DomainError::invalid_argument(
                "filter.minAge",
                "must not exceed maxAge"
            ))
        );
        let ratings = Filter {
            min_rating: Some(2.0),
            max_rating: Some(-2.0),
            ..Filter::default()
        };
        assert!(matches!(
            ratings.validate(),
            Err(DomainError::InvalidArgument { field, .. }) if field == "filter.minRating"
        ));

        let single_value = Filter {
            min_age: Some(25),
            max_age: Some(25),
            min_rating: Some(1.0),
            max_rating: Some(1.0),
            ..Filter::default()
        };
        assert!(single_value.validate().is_ok());
    }
}
