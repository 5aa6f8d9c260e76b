//! Row decoding shared by the Postgres repositories.

use std::str::FromStr;

use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row};
use uuid::Uuid;

use atomic_catalog::ImpactRoute;
use atomic_core::ImpactRouteId;

use crate::error::{RepositoryError, RepositoryResult, map_sqlx_error};

/// Typed column read.
pub(crate) fn get<'r, T>(row: &'r PgRow, column: &str) -> RepositoryResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column).map_err(|e| map_sqlx_error(column, e))
}

/// Non-negative `INTEGER` column as `u32`.
pub(crate) fn get_u32(row: &PgRow, column: &str) -> RepositoryResult<u32> {
    to_u32(column, get::<i32>(row, column)?)
}

pub(crate) fn get_opt_u32(row: &PgRow, column: &str) -> RepositoryResult<Option<u32>> {
    get::<Option<i32>>(row, column)?.map(|v| to_u32(column, v)).transpose()
}

fn to_u32(column: &str, value: i32) -> RepositoryResult<u32> {
    u32::try_from(value).map_err(|_| RepositoryError::Serialization(format!("{column} is negative: {value}")))
}

/// `TEXT` column parsed into a domain enum.
pub(crate) fn get_parsed<T>(row: &PgRow, column: &str) -> RepositoryResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = get(row, column)?;
    raw.parse()
        .map_err(|e: T::Err| RepositoryError::Serialization(format!("{column}: {e}")))
}

pub(crate) fn id_list<I>(ids: I) -> Vec<Uuid>
where
    I: IntoIterator<Item = Uuid>,
{
    let mut out: Vec<Uuid> = ids.into_iter().collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` substring pattern.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

pub(crate) const IMPACT_ROUTE_COLUMNS: &str =
    "id, slug, name, type, description, split_bps, wallet, public_url, location, active, notes";

pub(crate) fn impact_route_from_row(row: &PgRow) -> RepositoryResult<ImpactRoute> {
    Ok(ImpactRoute {
        id: ImpactRouteId::from_uuid(get(row, "id")?),
        slug: get(row, "slug")?,
        name: get(row, "name")?,
        route_type: get(row, "type")?,
        description: get(row, "description")?,
        split_bps: get_u32(row, "split_bps")?,
        wallet: get(row, "wallet")?,
        public_url: get(row, "public_url")?,
        location: get(row, "location")?,
        active: get(row, "active")?,
        notes: get(row, "notes")?,
    })
}
