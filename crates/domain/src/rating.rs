//! 评分规则
//!
//! 评分对目标的调整量为 `min(1, 归一化评分 * 2) * 方向 * 权重`，
//! 结果总是夹在 [-10, 10]；评分次数（rates）夹在 [0, 10]。

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};

pub const RATING_MIN: f64 = -10.0;
pub const RATING_MAX: f64 = 10.0;
pub const RATES_MAX: u32 = 10;

/// 夹在 [`RATING_MIN`, `RATING_MAX`] 内的评分
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Rating(f64);

impl Rating {
    pub fn new(value: f64) -> Self {
        if !value.is_finite() {
            return Self(0.0);
        }
        Self(value.clamp(RATING_MIN, RATING_MAX))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// -10..10 映射到 0..1
    pub fn normalized(self) -> f64 {
        (self.0 - RATING_MIN) / (RATING_MAX - RATING_MIN)
    }

    #[must_use]
    pub fn adjusted(self, delta: f64) -> Self {
        Self::new(self.0 + delta)
    }
}

impl From<f64> for Rating {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Rating> for f64 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    pub fn sign(self) -> f64 {
        match self {
            Vote::Up => 1.0,
            Vote::Down => -1.0,
        }
    }
}

/// 闭区间评分过滤，用于帖子和评论列表
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingRange {
    pub min: f64,
    pub max: f64,
}

impl Default for RatingRange {
    fn default() -> Self {
        Self {
            min: RATING_MIN,
            max: RATING_MAX,
        }
    }
}

impl RatingRange {
    pub fn new(min: f64, max: f64) -> DomainResult<Self> {
        for (field, value) in [("minRating", min), ("maxRating", max)] {
            if !(RATING_MIN..=RATING_MAX).contains(&value) {
                return Err(DomainError::invalid_argument(field, "out of range"));
            }
        }
        if min > max {
            return Err(DomainError::invalid_argument(
                "minRating",
                "must not exceed maxRating",
            ));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, rating: Rating) -> bool {
        (self.min..=self.max).contains(&rating.value())
    }
}

/// 评分发生的场景，决定作用到目标 profile 上的权重
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingContext {
    ChatPartner,
    CommentAuthor,
    PostAuthor,
}

impl RatingContext {
    pub fn weight(self) -> f64 {
        match self {
            RatingContext::ChatPartner => 0.1,
            RatingContext::CommentAuthor => 0.3,
            RatingContext::PostAuthor => 0.5,
        }
    }
}

/// 未加权的调整量，直接作用在被评价的帖子/评论上
pub fn vote_bias(rater: Rating, vote: Vote) -> f64 {
    (rater.normalized() * 2.0).min(1.0) * vote.sign()
}

/// 作用到目标 profile 上的调整量
pub fn profile_adjustment(rater: Rating, vote: Vote, context: RatingContext) -> f64 {
    vote_bias(rater, vote) * context.weight()
}

/// 消耗一次评分次数，下限 0
pub fn consume_rate(rates: u32) -> u32 {
    rates.saturating_sub(1).min(RATES_MAX)
}

/// 定期补充一次评分次数，上限 `max`
pub fn replenish_rate(rates: u32, max: u32) -> u32 {
    rates.saturating_add(1).min(max)
}
