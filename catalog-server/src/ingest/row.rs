//! Row orchestration
//!
//! Every data row runs in its own transaction and walks
//! `Start → CategoryResolved → ProductResolved → AttributesApplied → Committed`.
//! A row-aborting error rolls the transaction back and lands in `Aborted`;
//! field-local errors are logged and collected while the row carries on.

use super::columns::ColumnRoles;
use super::lookup::{GroupIndex, RegionIndex};
use super::product::{ProductDefaults, ProductFields};
use super::reader::SourceRow;
use super::settings::IngestSettings;
use super::{IngestError, Severity, category, characteristic, group, price, product};
use crate::db::repository::RepoError;
use crate::images::ImagePipeline;
use sqlx::{SqliteConnection, SqlitePool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Start,
    CategoryResolved,
    ProductResolved,
    AttributesApplied,
    Committed,
    Aborted,
}

/// Everything a row needs that stays fixed for the run
pub struct RowContext<'a> {
    pub settings: &'a IngestSettings,
    pub roles: &'a ColumnRoles,
    pub regions: &'a RegionIndex,
    pub groups: &'a GroupIndex,
    pub images: &'a ImagePipeline,
}

impl RowContext<'_> {
    fn value<'r>(&self, row: &'r SourceRow, column: &str) -> Option<&'r str> {
        self.roles.position(column).and_then(|i| row.value(i))
    }
}

#[derive(Debug)]
pub struct RowOutcome {
    pub line: usize,
    pub article: Option<String>,
    pub state: RowState,
    pub warnings: Vec<IngestError>,
    pub error: Option<IngestError>,
}

impl RowOutcome {
    pub fn is_committed(&self) -> bool {
        self.state == RowState::Committed
    }

    fn log(&self) {
        let article = self.article.as_deref().unwrap_or("-");
        for warning in &self.warnings {
            tracing::warn!(target: "import", line = self.line, article, code = ?warning.code(), error = %warning, "Field skipped");
        }
        if let Some(error) = &self.error {
            tracing::warn!(target: "import", line = self.line, article, code = ?error.code(), error = %error, "Row aborted");
        }
    }
}

/// Run one product row in its own transaction
pub async fn process_product_row(
    pool: &SqlitePool,
    ctx: &RowContext<'_>,
    row: &SourceRow,
) -> RowOutcome {
    let article = ctx
        .value(row, &ctx.settings.columns.article)
        .map(str::to_string);
    let mut state = RowState::Start;
    let mut warnings = Vec::new();

    let result = match pool.begin().await {
        Ok(mut tx) => match apply_product(&mut tx, ctx, row, &mut state, &mut warnings).await {
            Ok(()) => tx.commit().await.map_err(|e| IngestError::Transaction(e.into())),
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    tracing::error!(target: "import", line = row.line, error = %rb, "Rollback failed");
                }
                Err(e)
            }
        },
        Err(e) => Err(IngestError::Transaction(e.into())),
    };

    finish(row.line, article, state, warnings, result)
}

/// Run one brand row in its own transaction
pub async fn process_brand_row(
    pool: &SqlitePool,
    ctx: &RowContext<'_>,
    row: &SourceRow,
) -> RowOutcome {
    let name = ctx.value(row, &ctx.settings.brand_name_column);
    let order = ctx
        .value(row, &ctx.settings.brand_order_column)
        .and_then(product::parse_priority);
    let mut state = RowState::Start;

    let result = match name {
        None => Err(IngestError::BrandCreate {
            name: String::new(),
            source: RepoError::Validation("brand name is empty".into()),
        }),
        Some(name) => match pool.begin().await {
            Ok(mut tx) => match product::resolve_brand(&mut tx, name, order).await {
                Ok(brand) => {
                    tracing::debug!(target: "import", line = row.line, brand = %brand.name, id = brand.id, "Brand resolved");
                    state = RowState::AttributesApplied;
                    tx.commit().await.map_err(|e| IngestError::Transaction(e.into()))
                }
                Err(source) => {
                    if let Err(rb) = tx.rollback().await {
                        tracing::error!(target: "import", line = row.line, error = %rb, "Rollback failed");
                    }
                    Err(IngestError::BrandCreate {
                        name: name.to_string(),
                        source,
                    })
                }
            },
            Err(e) => Err(IngestError::Transaction(e.into())),
        },
    };

    finish(row.line, name.map(str::to_string), state, Vec::new(), result)
}

fn finish(
    line: usize,
    article: Option<String>,
    state: RowState,
    warnings: Vec<IngestError>,
    result: Result<(), IngestError>,
) -> RowOutcome {
    let (state, error) = match result {
        Ok(()) => (RowState::Committed, None),
        Err(e) => {
            debug_assert_ne!(e.severity(), Severity::Field);
            tracing::trace!(line, from = ?state, "Row state before abort");
            (RowState::Aborted, Some(e))
        }
    };
    let outcome = RowOutcome {
        line,
        article,
        state,
        warnings,
        error,
    };
    outcome.log();
    outcome
}

async fn apply_product(
    conn: &mut SqliteConnection,
    ctx: &RowContext<'_>,
    row: &SourceRow,
    state: &mut RowState,
    warnings: &mut Vec<IngestError>,
) -> Result<(), IngestError> {
    let settings = ctx.settings;
    let columns = &settings.columns;

    let path_cell = ctx.value(row, &columns.categories).unwrap_or_default();
    let path = category::split_path(path_cell, &settings.category_delimiter);
    let chain = category::resolve(conn, &path, settings.tree_id).await?;
    *state = RowState::CategoryResolved;

    let fields = ProductFields {
        article: ctx.value(row, &columns.article).unwrap_or_default(),
        title: ctx.value(row, &columns.title),
        description: ctx.value(row, &columns.description),
        priority: ctx.value(row, &columns.priority),
        brand: ctx.value(row, &columns.brand),
        in_stock: ctx.value(row, &columns.in_stock),
    };
    let defaults = ProductDefaults {
        title: &settings.default_title,
        description: &settings.default_description,
        priority: settings.default_priority,
    };
    let product = product::resolve(conn, &fields, &chain, defaults, warnings).await?;
    *state = RowState::ProductResolved;

    let leaf_id = product.category_id;
    for column in &ctx.roles.characteristics {
        let Some(value) = row.value(column.index) else {
            continue;
        };
        if let Err(e) = characteristic::apply(
            conn,
            product.id,
            leaf_id,
            &column.name,
            value,
            settings.characteristic_scope,
        )
        .await
        {
            warnings.push(e);
        }
    }

    for column in &ctx.roles.regions {
        if let Err(e) = price::apply(
            conn,
            product.id,
            ctx.regions,
            &column.name,
            row.cell(column.index),
            settings.clear_price_if_empty,
        )
        .await
        {
            warnings.push(e);
        }
    }

    if let Some(cell) = ctx.value(row, &columns.group) {
        let (_, errors) = group::apply(conn, product.id, ctx.groups, cell, settings.group_delimiter).await;
        warnings.extend(errors);
    }

    if let Some(cell) = ctx.value(row, &columns.images) {
        warnings.extend(ctx.images.process_product(conn, &product, cell).await);
    }

    *state = RowState::AttributesApplied;
    Ok(())
}
