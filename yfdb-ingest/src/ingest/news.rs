//! Latest news articles from the ticker stream

use super::json::{epoch_iso, flag, items, text};
use super::Ingestor;
use crate::db::schema::Table;
use crate::error::Result;
use serde_json::Value;
use tracing::debug;
use yfdb_common::db::{Row, UpsertStats};

/// One row per article id; items without an id are skipped
pub fn news_rows(symbol: &str, stream: &Value) -> Vec<Row> {
    let mut rows: Vec<Row> = Vec::new();

    for item in items(stream) {
        let content = &item["content"];
        let Some(id) = text(&item["id"]).or_else(|| text(&content["id"])) else {
            continue;
        };
        if rows.iter().any(|r| r.get("id").and_then(|v| v.as_str()) == Some(id.as_str())) {
            continue;
        }

        let provider = &content["provider"];
        let canonical = &content["canonicalUrl"];
        let premium = &content["finance"]["premiumFinance"];

        rows.push(
            Row::new()
                .with("id", id)
                .with("symbol", symbol)
                .with("content_type", text(&content["contentType"]))
                .with("title", text(&content["title"]))
                .with("description", text(&content["description"]))
                .with("summary", text(&content["summary"]))
                .with("pub_date", epoch_iso(&content["pubDate"]))
                .with("display_time", epoch_iso(&content["displayTime"]))
                .with("provider_name", text(&provider["displayName"]))
                .with("provider_url", text(&provider["url"]))
                .with("canonical_url", text(&canonical["url"]))
                .with("site", text(&canonical["site"]))
                .with("region", text(&canonical["region"]))
                .with("lang", text(&canonical["lang"]))
                .with("click_through_url", text(&content["clickThroughUrl"]["url"]))
                .with("preview_url", text(&content["previewUrl"]))
                .with("is_hosted", flag(&content["isHosted"]))
                .with("bypass_modal", flag(&content["bypassModal"]))
                .with("editors_pick", flag(&content["metadata"]["editorsPick"]))
                .with("is_premium_news", flag(&premium["isPremiumNews"]))
                .with("is_premium_free_news", flag(&premium["isPremiumFreeNews"])),
        );
    }

    rows
}

pub async fn insert_stock_news(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let count = ingestor.yahoo().settings().news_count;
    let stream = ingestor.yahoo().news(symbol, count).await?;

    let rows = news_rows(symbol, &stream);
    if rows.is_empty() {
        debug!(symbol, "No news found");
        return Ok(UpsertStats::default());
    }
    ingestor.db().upsert(Table::News, &rows).await
}
