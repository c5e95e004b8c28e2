//! Custom metadata definitions used by the bundled policies and commands.

use tidemark_catalog::{
    AttributeDef, AttributeType, BadgeColor, BadgeCondition, BadgeOperator, BadgeSpec,
    EnumDefinition, Logo, SchemaDefinition,
};

pub const DAAP: &str = "DaaP";
pub const DAAP_SCORE: &str = "Score";

pub const QUALITY_DATA: &str = "Quality Data";
pub const QUALITY_RATING: &str = "Rating";
pub const QUALITY_PASSED: &str = "Passed count";
pub const QUALITY_FAILED: &str = "Failed count";
pub const QUALITY_REPORTS: &str = "Detailed reports";
pub const QUALITY_RATING_ENUM: &str = "QDRating";

const QUALITY_LOGO_URL: &str = "http://assets.atlan.com/assets/atlan-a-logo-blue-background.png";

/// Completeness score, badged green at 75 and above, red at 25 and below.
pub fn daap_definition() -> SchemaDefinition {
    SchemaDefinition::new(DAAP)
        .with_attribute(AttributeDef::new(DAAP_SCORE, AttributeType::Decimal))
        .with_logo(Logo::Emoji("🔖".to_string()))
        .with_badge(BadgeSpec::new(
            DAAP_SCORE,
            vec![
                BadgeCondition::new(BadgeOperator::Gte, "75", BadgeColor::Green),
                BadgeCondition::new(BadgeOperator::Lt, "75", BadgeColor::Yellow),
                BadgeCondition::new(BadgeOperator::Lte, "25", BadgeColor::Red),
            ],
        ))
}

/// Overall data quality rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityRating {
    Poor,
    Ok,
    Great,
}

impl QualityRating {
    pub const ALL: [QualityRating; 3] = [QualityRating::Poor, QualityRating::Ok, QualityRating::Great];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityRating::Poor => "Poor",
            QualityRating::Ok => "OK",
            QualityRating::Great => "Great",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(value))
    }

    fn badge_color(&self) -> BadgeColor {
        match self {
            QualityRating::Poor => BadgeColor::Red,
            QualityRating::Ok => BadgeColor::Yellow,
            QualityRating::Great => BadgeColor::Green,
        }
    }
}

/// Options backing the quality rating attribute.
pub fn quality_rating_enum() -> EnumDefinition {
    EnumDefinition::new(QUALITY_RATING_ENUM, QualityRating::ALL.map(|r| r.as_str()))
}

/// Branded quality definition. The rating enumeration must exist first.
pub fn quality_data_definition() -> SchemaDefinition {
    let rating_badge = BadgeSpec::new(
        QUALITY_RATING,
        [QualityRating::Great, QualityRating::Ok, QualityRating::Poor]
            .iter()
            .map(|r| {
                BadgeCondition::new(
                    BadgeOperator::Eq,
                    format!("\"{}\"", r.as_str()),
                    r.badge_color(),
                )
            })
            .collect(),
    )
    .with_description("Overall quality rating for the asset.");

    SchemaDefinition::new(QUALITY_DATA)
        .with_attribute(AttributeDef::new(
            QUALITY_RATING,
            AttributeType::Options {
                enum_name: QUALITY_RATING_ENUM.to_string(),
            },
        ))
        .with_attribute(AttributeDef::new(QUALITY_PASSED, AttributeType::Integer))
        .with_attribute(AttributeDef::new(QUALITY_FAILED, AttributeType::Integer))
        .with_attribute(AttributeDef::new(QUALITY_REPORTS, AttributeType::Url).multi_valued())
        .with_logo(Logo::ImageUrl(QUALITY_LOGO_URL.to_string()))
        .with_badge(rating_badge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_are_valid() {
        daap_definition().validate().unwrap();
        quality_data_definition().validate().unwrap();
    }

    #[test]
    fn test_rating_badge_quotes_values() {
        let definition = quality_data_definition();
        let badge = &definition.badges[0];
        assert_eq!(badge.attribute, QUALITY_RATING);
        assert_eq!(badge.conditions[0].value, "\"Great\"");
        assert_eq!(badge.conditions[0].color, BadgeColor::Green);
        assert_eq!(badge.conditions[2].color, BadgeColor::Red);
    }

    #[test]
    fn test_rating_parse() {
        assert_eq!(QualityRating::parse("ok"), Some(QualityRating::Ok));
        assert_eq!(QualityRating::parse("Great"), Some(QualityRating::Great));
        assert_eq!(QualityRating::parse("Excellent"), None);
        assert_eq!(quality_rating_enum().values, vec!["Poor", "OK", "Great"]);
    }
}
