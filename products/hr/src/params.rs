use sea_orm::{
    ColumnTrait, Condition, EntityTrait, Order, QueryOrder, QuerySelect, Select,
    sea_query::{Expr, Func, LikeExpr},
};
use serde::{Deserialize, Deserializer};

use crate::error::{HrError, HrResult};

pub const MAX_LIMIT: u64 = 200;

/// Query string accepted by every list endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    /// Comma separated field names, `-` prefix for descending.
    pub ordering: Option<String>,
    /// Lists are unbounded unless `limit` or `offset` is given.
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ListParams {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    pub fn ordering(ordering: impl Into<String>) -> Self {
        Self {
            ordering: Some(ordering.into()),
            ..Self::default()
        }
    }

    fn search_term(&self) -> Option<String> {
        sanitize_optional_filter(self.search.clone())
    }

    fn page(&self) -> Option<(u64, u64)> {
        if self.limit.is_none() && self.offset.is_none() {
            return None;
        }
        let limit = self.limit.unwrap_or(MAX_LIMIT).clamp(1, MAX_LIMIT);
        Some((limit, self.offset.unwrap_or(0)))
    }
}

/// Case-insensitive substring match over `columns`, or `None` for an empty term.
pub(crate) fn search_condition<C>(params: &ListParams, columns: &[C]) -> Option<Condition>
where
    C: ColumnTrait,
{
    let term = params.search_term()?;
    let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
    let condition = columns.iter().fold(Condition::any(), |condition, column| {
        let lowered = Expr::expr(Func::lower(Expr::col(*column)));
        condition.add(lowered.like(LikeExpr::new(pattern.clone()).escape('\\')))
    });
    Some(condition)
}

/// Makes `%`, `_` and `\` match literally under `ESCAPE '\'`.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Applies the requested ordering, falling back to `default` when none is given.
///
/// Every query gets the primary key as a final tiebreaker so pages are stable.
pub(crate) fn apply_ordering<E, C>(
    mut query: Select<E>,
    params: &ListParams,
    allowed: &[(&'static str, C)],
    default: C,
    tiebreak: C,
) -> HrResult<Select<E>>
where
    E: EntityTrait,
    C: ColumnTrait,
{
    let requested = params
        .ordering
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty());
    match requested {
        None => {
            query = query.order_by(default, Order::Asc);
        }
        Some(raw) => {
            for field in raw.split(',').map(str::trim).filter(|f| !f.is_empty()) {
                let (name, order) = match field.strip_prefix('-') {
                    Some(name) => (name, Order::Desc),
                    None => (field, Order::Asc),
                };
                let column = allowed
                    .iter()
                    .find(|(allowed_name, _)| *allowed_name == name)
                    .map(|(_, column)| *column)
                    .ok_or_else(|| {
                        HrError::validation(format!("Cannot order by field '{name}'."))
                    })?;
                query = query.order_by(column, order);
            }
        }
    }
    Ok(query.order_by(tiebreak, Order::Asc))
}

pub(crate) fn paginate<E>(query: Select<E>, params: &ListParams) -> Select<E>
where
    E: EntityTrait,
{
    match params.page() {
        Some((limit, offset)) => query.limit(limit).offset(offset),
        None => query,
    }
}

pub(crate) fn sanitize_optional_filter(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub(crate) fn validate_length(field: &str, value: &str, max: usize) -> HrResult<()> {
    if value.chars().count() > max {
        return Err(HrError::validation(format!(
            "{field}: Ensure this field has no more than {max} characters."
        )));
    }
    Ok(())
}

pub(crate) fn validate_required(field: &str, value: &str, max: usize) -> HrResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HrError::validation(format!(
            "{field}: This field may not be blank."
        )));
    }
    validate_length(field, trimmed, max)?;
    Ok(trimmed.to_string())
}
