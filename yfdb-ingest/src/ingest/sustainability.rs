//! ESG scores, peer ranges and involvement flags from `esgScores`

use super::fields::{self, flag_field, integer, real, text_field, Field};
use super::json::{json_text, num};
use super::Ingestor;
use crate::db::schema::Table;
use crate::error::Result;
use serde_json::Value;
use tracing::debug;
use yfdb_common::db::{Row, UpsertStats};

pub const SCORE_FIELDS: &[Field] = &[
    integer("max_age", "maxAge"),
    integer("rating_year", "ratingYear"),
    integer("rating_month", "ratingMonth"),
    real("total_esg", "totalEsg"),
    real("environment_score", "environmentScore"),
    real("social_score", "socialScore"),
    real("governance_score", "governanceScore"),
    real("highest_controversy", "highestControversy"),
    text_field("esg_performance", "esgPerformance"),
    integer("peer_count", "peerCount"),
    text_field("peer_group", "peerGroup"),
    real("percentile", "percentile"),
    real("environment_percentile", "environmentPercentile"),
    real("social_percentile", "socialPercentile"),
    real("governance_percentile", "governancePercentile"),
];

/// (JSON key, column prefix) of the min/avg/max peer blocks
pub const PEER_RANGES: &[(&str, &str)] = &[
    ("peerEsgScorePerformance", "peer_esg"),
    ("peerGovernancePerformance", "peer_governance"),
    ("peerSocialPerformance", "peer_social"),
    ("peerEnvironmentPerformance", "peer_environment"),
    ("peerHighestControversyPerformance", "peer_controversy"),
];

pub const RANGE_STATS: [&str; 3] = ["min", "avg", "max"];

pub const INVOLVEMENT_FIELDS: &[Field] = &[
    flag_field("adult", "adult"),
    flag_field("alcoholic", "alcoholic"),
    flag_field("animal_testing", "animalTesting"),
    flag_field("catholic", "catholic"),
    flag_field("controversial_weapons", "controversialWeapons"),
    flag_field("small_arms", "smallArms"),
    flag_field("fur_leather", "furLeather"),
    flag_field("gambling", "gambling"),
    flag_field("gmo", "gmo"),
    flag_field("military_contract", "militaryContract"),
    flag_field("nuclear", "nuclear"),
    flag_field("pesticides", "pesticides"),
    flag_field("palm_oil", "palmOil"),
    flag_field("coal", "coal"),
    flag_field("tobacco", "tobacco"),
];

/// Peer range column names, e.g. `peer_esg_min`
pub fn peer_range_columns() -> Vec<String> {
    PEER_RANGES
        .iter()
        .flat_map(|(_, prefix)| RANGE_STATS.iter().map(move |stat| format!("{}_{}", prefix, stat)))
        .collect()
}

pub fn sustainability_row(symbol: &str, summary: &Value) -> Option<Row> {
    let scores = &summary["esgScores"];
    if !scores.is_object() {
        return None;
    }

    let mut row = Row::new().with("symbol", symbol);
    fields::apply(&mut row, scores, SCORE_FIELDS);
    for (key, prefix) in PEER_RANGES {
        for stat in RANGE_STATS {
            row.set(&format!("{}_{}", prefix, stat), num(&scores[*key][stat]));
        }
    }
    row.set("related_controversy", json_text(&scores["relatedControversy"]));
    fields::apply(&mut row, scores, INVOLVEMENT_FIELDS);

    Some(row)
}

pub async fn insert_stock_sustainability(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let summary = ingestor.yahoo().quote_summary(symbol, &["esgScores"]).await?;

    match sustainability_row(symbol, &summary) {
        Some(row) => ingestor.db().upsert(Table::Sustainability, &[row]).await,
        None => {
            debug!(symbol, "No sustainability data found");
            Ok(UpsertStats::default())
        }
    }
}
