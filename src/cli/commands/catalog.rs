use crate::catalog::PageEnvelope;
use crate::cli::PageArgs;
use crate::config::Config;
use crate::domain::{BrandId, ModelId, SearchScope};
use crate::models::{EngineVariant, SearchHit};
use crate::state::SharedState;

pub async fn cmd_brands(
    config: &Config,
    search: Option<&str>,
    page: PageArgs,
) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let envelope = state
        .orchestrator
        .list_brands(search, page.page, page.limit)
        .await;

    print_page("Brands", &envelope, |brand| {
        let alias = if brand.alias.is_empty() {
            String::new()
        } else {
            format!(" ({})", brand.alias)
        };
        format!("[{}] {}{}", brand.id, brand.name, alias)
    });
    Ok(())
}

pub async fn cmd_models(
    config: &Config,
    brand_id: i32,
    year: Option<i32>,
    search: Option<&str>,
    page: PageArgs,
) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let envelope = state
        .orchestrator
        .list_models(BrandId::new(brand_id), year, search, page.page, page.limit)
        .await;

    let title = year.map_or_else(
        || format!("Models of brand {brand_id}"),
        |y| format!("Models of brand {brand_id} built in {y}"),
    );
    print_page(&title, &envelope, |model| {
        let full = model.full_name.as_deref().unwrap_or(&model.name);
        format!("[{}] {}", model.id, full)
    });
    Ok(())
}

pub async fn cmd_variants(
    config: &Config,
    model_id: i32,
    search: Option<&str>,
    page: PageArgs,
) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let envelope = state
        .orchestrator
        .list_engine_variants(ModelId::new(model_id), search, page.page, page.limit)
        .await;

    print_page(
        &format!("Engine variants of model {model_id}"),
        &envelope,
        describe_variant,
    );
    Ok(())
}

pub async fn cmd_search(
    config: &Config,
    query: &str,
    scope: Option<&str>,
    page: PageArgs,
) -> anyhow::Result<()> {
    let scope = scope
        .map(str::parse::<SearchScope>)
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let state = SharedState::new(config.clone()).await?;
    let envelope = state
        .orchestrator
        .search_by_text(query, scope, page.page, page.limit)
        .await;

    print_page(&format!("Results for \"{query}\""), &envelope, |hit| match hit {
        SearchHit::Brand(b) => format!("brand   [{}] {}", b.id, b.name),
        SearchHit::Model(m) => format!("model   [{}] {}", m.id, m.name),
        SearchHit::EngineVariant(v) => format!("variant {}", describe_variant(v)),
    });
    Ok(())
}

fn describe_variant(variant: &EngineVariant) -> String {
    let window = &variant.production;
    let years = window.year_to.map_or_else(
        || format!("{}-", window.year_from),
        |to| format!("{}-{to}", window.year_from),
    );
    let power = match (variant.power_kw, variant.power_hp) {
        (Some(kw), Some(hp)) => format!(" {kw} kW / {hp} hp"),
        (Some(kw), None) => format!(" {kw} kW"),
        (None, Some(hp)) => format!(" {hp} hp"),
        (None, None) => String::new(),
    };
    let codes = if variant.codes.is_empty() {
        String::new()
    } else {
        let joined = variant
            .codes
            .iter()
            .map(|c| format!("{}:{}", c.kind.as_str(), c.code))
            .collect::<Vec<_>>()
            .join(", ");
        format!(" [{joined}]")
    };
    format!(
        "[{}] {} ({years}){}{power}{codes}",
        variant.id,
        variant.name,
        variant
            .fuel
            .as_deref()
            .map(|f| format!(" {f}"))
            .unwrap_or_default()
    )
}

fn print_page<T>(title: &str, envelope: &PageEnvelope<T>, line: impl Fn(&T) -> String) {
    if !envelope.success {
        println!(
            "{}",
            envelope
                .message
                .as_deref()
                .unwrap_or("The catalog request failed")
        );
        return;
    }

    println!(
        "{title} (page {}, {} of {} total)",
        envelope.page,
        envelope.data.len(),
        envelope.total
    );
    println!("{:-<70}", "");

    if envelope.data.is_empty() {
        println!("Nothing found.");
        return;
    }

    for item in &envelope.data {
        println!("• {}", line(item));
    }
}
