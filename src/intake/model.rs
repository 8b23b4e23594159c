//! Intake records, partial updates and the submission payload.

use serde::{Deserialize, Serialize, Serializer};

/// Placeholder identity token held until the auth provider reports the real one.
pub const PLACEHOLDER_USER_ID: &str = "clerk_123";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
        }
    }
}

/// How often the user is physically active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityFrequency {
    Sedentary,
    #[default]
    Moderate,
    Active,
}

impl std::fmt::Display for ActivityFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sedentary => write!(f, "sedentary"),
            Self::Moderate => write!(f, "moderate"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// The activity choice shown to the user on the metrics step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl ActivityLevel {
    pub fn frequency(self) -> ActivityFrequency {
        match self {
            Self::Low => ActivityFrequency::Sedentary,
            Self::Medium => ActivityFrequency::Moderate,
            Self::High => ActivityFrequency::Active,
        }
    }

    pub fn from_frequency(frequency: ActivityFrequency) -> Self {
        match frequency {
            ActivityFrequency::Sedentary => Self::Low,
            ActivityFrequency::Moderate => Self::Medium,
            ActivityFrequency::Active => Self::High,
        }
    }
}

impl std::str::FromStr for ActivityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown activity level: {other}")),
        }
    }
}

/// Who the user is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityRecord {
    pub name: String,
    /// 0 means "not entered yet".
    pub age: u32,
    pub gender: Gender,
    /// Token issued by the authentication provider.
    pub clerk_user_id: String,
}

impl Default for IdentityRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: 0,
            gender: Gender::default(),
            clerk_user_id: PLACEHOLDER_USER_ID.to_string(),
        }
    }
}

impl IdentityRecord {
    /// Shallow merge: only keys present in `patch` are overwritten.
    ///
    /// The token follows "last non-empty wins": an empty token never
    /// replaces the stored one, and the placeholder never replaces a real one.
    pub fn merge(&mut self, patch: IdentityPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(age) = patch.age {
            self.age = age;
        }
        if let Some(gender) = patch.gender {
            self.gender = gender;
        }
        if let Some(token) = patch.clerk_user_id {
            let token = token.trim();
            let regresses = token == PLACEHOLDER_USER_ID && self.has_token();
            if !token.is_empty() && !regresses {
                self.clerk_user_id = token.to_string();
            }
        }
    }

    /// Whether a real token (not the placeholder) is held.
    pub fn has_token(&self) -> bool {
        !self.clerk_user_id.is_empty() && self.clerk_user_id != PLACEHOLDER_USER_ID
    }
}

/// Body metrics and goals. Zero means "not entered yet".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsRecord {
    /// Kilograms.
    #[serde(serialize_with = "whole_as_integer")]
    pub current_weight: f64,
    /// Centimeters.
    #[serde(serialize_with = "whole_as_integer")]
    pub height: f64,
    /// Kilograms.
    #[serde(serialize_with = "whole_as_integer")]
    pub target_weight: f64,
    pub activity_frequency: ActivityFrequency,
}

impl Default for MetricsRecord {
    fn default() -> Self {
        Self {
            current_weight: 0.0,
            height: 0.0,
            target_weight: 0.0,
            activity_frequency: ActivityFrequency::default(),
        }
    }
}

impl MetricsRecord {
    /// Shallow merge: only keys present in `patch` are overwritten.
    pub fn merge(&mut self, patch: MetricsPatch) {
        if let Some(w) = patch.current_weight {
            self.current_weight = w;
        }
        if let Some(h) = patch.height {
            self.height = h;
        }
        if let Some(t) = patch.target_weight {
            self.target_weight = t;
        }
        if let Some(a) = patch.activity_frequency {
            self.activity_frequency = a;
        }
    }
}

/// Writes whole numbers without a fractional part (`70` rather than `70.0`),
/// which is what the meal-plan service has always received.
fn whole_as_integer<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// A subset of identity fields. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityPatch {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub clerk_user_id: Option<String>,
}

impl IdentityPatch {
    /// Patch carrying only the identity token.
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            clerk_user_id: Some(token.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.clerk_user_id = Some(token.into());
        self
    }
}

/// A subset of metrics fields. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsPatch {
    pub current_weight: Option<f64>,
    pub height: Option<f64>,
    pub target_weight: Option<f64>,
    pub activity_frequency: Option<ActivityFrequency>,
}

impl MetricsPatch {
    pub fn with_current_weight(mut self, kg: f64) -> Self {
        self.current_weight = Some(kg);
        self
    }

    pub fn with_height(mut self, cm: f64) -> Self {
        self.height = Some(cm);
        self
    }

    pub fn with_target_weight(mut self, kg: f64) -> Self {
        self.target_weight = Some(kg);
        self
    }

    pub fn with_activity(mut self, frequency: ActivityFrequency) -> Self {
        self.activity_frequency = Some(frequency);
        self
    }
}

/// The snapshot sent to the meal-plan service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionPayload {
    pub user: IdentityRecord,
    pub form: MetricsRecord,
    pub allergies: Vec<String>,
}
