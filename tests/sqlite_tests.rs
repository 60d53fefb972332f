use std::sync::Arc;

use vehicle_catalog::catalog::{CompatibilityResolver, ExhaustivePaginator};
use vehicle_catalog::config::Config;
use vehicle_catalog::db::{
    BrandRecord, CatalogImport, EngineCodeRecord, EngineVariantRecord, ModelRecord, Store,
};
use vehicle_catalog::domain::{BrandId, ModelId};
use vehicle_catalog::models::EngineCodeKind;
use vehicle_catalog::rows::{Filter, MemoryRowStore, Row, RowQuery, RowStore, Table};
use vehicle_catalog::state::SharedState;

async fn memory_store() -> Store {
    // one connection: every sqlite :memory: connection is its own database
    Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("Failed to open in-memory catalog")
}

fn variant(id: i32, model_id: i32, from: i32, to: Option<i32>) -> EngineVariantRecord {
    EngineVariantRecord {
        id,
        model_id,
        brand_id: 1,
        name: format!("1.{id} dCi"),
        fuel: Some("diesel".to_string()),
        power_kw: Some(66),
        power_hp: Some(90),
        year_from: from,
        month_from: None,
        year_to: to,
        month_to: None,
        active: true,
    }
}

fn sample_import() -> CatalogImport {
    CatalogImport {
        brands: vec![
            BrandRecord {
                id: 1,
                name: "Renault".to_string(),
                alias: Some("RENAULT".to_string()),
                active: true,
                sort_order: Some(1),
            },
            BrandRecord {
                id: 2,
                name: "Peugeot".to_string(),
                alias: None,
                active: true,
                sort_order: Some(2),
            },
        ],
        models: vec![
            ModelRecord {
                id: 10,
                brand_id: 1,
                name: "Clio".to_string(),
                full_name: Some("Clio IV".to_string()),
                alias: None,
                active: true,
            },
            ModelRecord {
                id: 11,
                brand_id: 1,
                name: "Megane".to_string(),
                full_name: None,
                alias: None,
                active: true,
            },
        ],
        engine_variants: vec![
            variant(100, 10, 2012, None),
            variant(101, 11, 2002, Some(2008)),
            variant(102, 10, 2005, Some(2012)),
        ],
        engine_codes: vec![EngineCodeRecord {
            engine_variant_id: 100,
            kind: EngineCodeKind::Motor,
            code: "K9K".to_string(),
        }],
    }
}

#[tokio::test]
async fn import_is_idempotent() {
    let store = memory_store().await;

    store.import_catalog(&sample_import()).await.unwrap();
    let summary = store.import_catalog(&sample_import()).await.unwrap();
    assert_eq!(summary.engine_variants, 3);

    let counts = store.table_counts().await.unwrap();
    assert_eq!(counts.brands, 2);
    assert_eq!(counts.models, 2);
    assert_eq!(counts.engine_variants, 3);
    assert_eq!(counts.engine_codes, 1);
}

#[tokio::test]
async fn row_store_applies_cap_filters_and_counts() {
    let store = memory_store().await;
    let mut import = sample_import();
    import.engine_variants = (1..=25).map(|id| variant(id, 10, 2000 + id, None)).collect();
    import.engine_codes.clear();
    store.import_catalog(&import).await.unwrap();

    let rows = store.row_store(10);
    let page = rows
        .select(&RowQuery::select(Table::EngineVariants).order_asc("id"))
        .await
        .unwrap();
    assert_eq!(page.rows.len(), 10);

    let counted = rows
        .select(
            &RowQuery::select(Table::EngineVariants)
                .filter(Filter::lte("year_from", 2010))
                .count_only(),
        )
        .await
        .unwrap();
    assert_eq!(counted.count, Some(10));

    let swept = ExhaustivePaginator::new(10, None)
        .collect(rows.as_ref(), &RowQuery::select(Table::EngineVariants))
        .await
        .unwrap();
    assert_eq!(swept.len(), 25);
}

#[tokio::test]
async fn search_escapes_like_wildcards() {
    let store = memory_store().await;
    store.import_catalog(&sample_import()).await.unwrap();
    let rows = store.row_store(1000);

    let hits = rows
        .select(
            &RowQuery::select(Table::Brands)
                .filter(Filter::contains_any(&["name", "alias"], "%")),
        )
        .await
        .unwrap();
    assert!(hits.rows.is_empty());

    let hits = rows
        .select(
            &RowQuery::select(Table::Brands)
                .filter(Filter::contains_any(&["name", "alias"], "NAU")),
        )
        .await
        .unwrap();
    assert_eq!(hits.rows.len(), 1);
}

fn accented_brands() -> Vec<BrandRecord> {
    [
        (1, "Škoda", Some("SKODA")),
        (2, "Citroën", None),
        (3, "Renault", None),
        (4, "ŠKODA Auto", Some("Mladá Boleslav")),
    ]
    .into_iter()
    .map(|(id, name, alias)| BrandRecord {
        id,
        name: name.to_string(),
        alias: alias.map(str::to_string),
        active: true,
        sort_order: Some(id),
    })
    .collect()
}

async fn brand_hits(rows: &dyn RowStore, needle: &str) -> Vec<i64> {
    let page = rows
        .select(
            &RowQuery::select(Table::Brands)
                .filter(Filter::contains_any(&["name", "alias"], needle))
                .order_asc("id"),
        )
        .await
        .unwrap();
    page.rows
        .iter()
        .map(|row| row.int(Table::Brands, "id").unwrap())
        .collect()
}

#[tokio::test]
async fn substring_search_folds_non_ascii_like_the_memory_store() {
    let store = memory_store().await;
    let import = CatalogImport {
        brands: accented_brands(),
        ..Default::default()
    };
    store.import_catalog(&import).await.unwrap();
    let sqlite = store.row_store(1000);

    let memory = MemoryRowStore::new();
    memory.insert_many(
        Table::Brands,
        accented_brands().into_iter().map(|b| {
            Row::new()
                .with("id", b.id)
                .with("name", b.name)
                .with("alias", b.alias)
                .with("active", b.active)
                .with("sort_order", b.sort_order)
        }),
    );

    for (needle, expected) in [
        ("Škoda", vec![1, 4]),
        ("škoda", vec![1, 4]),
        ("ŠKO", vec![1, 4]),
        ("CITROËN", vec![2]),
        ("ën", vec![2]),
        ("MLADÁ", vec![4]),
        ("skoda", vec![1]),
    ] {
        let from_sqlite = brand_hits(sqlite.as_ref(), needle).await;
        let from_memory = brand_hits(&memory, needle).await;
        assert_eq!(from_sqlite, expected, "{needle}");
        assert_eq!(from_sqlite, from_memory, "{needle}");
    }
}

#[tokio::test]
async fn accented_brand_is_listed_by_exact_name() {
    let store = memory_store().await;
    let import = CatalogImport {
        brands: accented_brands(),
        ..Default::default()
    };
    store.import_catalog(&import).await.unwrap();
    let state = SharedState::with_row_store(Config::default(), store.row_store(1000));

    let brands = state.orchestrator.list_brands(Some("Škoda"), None, None).await;
    assert!(brands.success);
    assert_eq!(brands.total, 2);
    assert_eq!(brands.data[0].name, "Škoda");
}

#[tokio::test]
async fn resolver_matches_production_windows_in_sql() {
    let store = memory_store().await;
    store.import_catalog(&sample_import()).await.unwrap();
    let resolver = CompatibilityResolver::new(store.row_store(1000), ExhaustivePaginator::default());

    let in_2006: Vec<ModelId> = resolver
        .resolve(BrandId::new(1), 2006)
        .await
        .unwrap()
        .iter()
        .collect();
    assert_eq!(in_2006, vec![ModelId::new(10), ModelId::new(11)]);

    let in_2020 = resolver.resolve(BrandId::new(1), 2020).await.unwrap();
    assert_eq!(in_2020.iter().collect::<Vec<_>>(), vec![ModelId::new(10)]);

    assert!(resolver.resolve(BrandId::new(1), 1999).await.unwrap().is_empty());
}

#[tokio::test]
async fn orchestrator_over_sqlite() {
    let store = memory_store().await;
    store.import_catalog(&sample_import()).await.unwrap();
    let row_store: Arc<dyn RowStore> = store.row_store(1000);
    let state = SharedState::with_row_store(Config::default(), row_store);

    let brands = state.orchestrator.list_brands(None, None, None).await;
    assert!(brands.success);
    assert_eq!(brands.total, 2);
    assert_eq!(brands.data[0].name, "Renault");

    let models = state
        .orchestrator
        .list_models(BrandId::new(1), Some(2010), None, None, None)
        .await;
    assert_eq!(models.total, 1);
    assert_eq!(models.data[0].full_name.as_deref(), Some("Clio IV"));

    let variants = state
        .orchestrator
        .list_engine_variants(ModelId::new(10), None, None, None)
        .await;
    assert_eq!(variants.total, 2);
    let with_code = variants
        .data
        .iter()
        .find(|v| v.id.value() == 100)
        .unwrap();
    assert_eq!(with_code.codes[0].kind, EngineCodeKind::Motor);
}
