//! Coupon repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use qui_core::{CouponRules, CouponTerms, DiscountType};

use super::{RepositoryError, conflict_on_unique, parse_column};
use crate::models::Coupon;

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    code: String,
    description: String,
    discount: Decimal,
    discount_type: String,
    for_new_user: bool,
    for_member: bool,
    is_public: bool,
    expires_at: DateTime<Utc>,
    used_count: i32,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = RepositoryError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        Ok(Self {
            code: row.code,
            description: row.description,
            terms: CouponTerms {
                discount: row.discount,
                discount_type: parse_column::<DiscountType>(
                    &row.discount_type,
                    "coupons.discount_type",
                )?,
            },
            rules: CouponRules {
                for_new_user: row.for_new_user,
                for_member: row.for_member,
            },
            is_public: row.is_public,
            expires_at: row.expires_at,
            used_count: row.used_count,
        })
    }
}

/// Coupon data for creation.
#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub code: String,
    pub description: String,
    pub terms: CouponTerms,
    pub rules: CouponRules,
    pub is_public: bool,
    pub expires_at: DateTime<Utc>,
}

/// Repository for coupon database operations.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a coupon by code that has not expired at `now`.
    ///
    /// The code is normalized to uppercase before lookup.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the discount type is unknown.
    pub async fn find_active(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(
            r"
            SELECT code, description, discount, discount_type, for_new_user,
                   for_member, is_public, expires_at, used_count
            FROM storefront.coupons
            WHERE code = $1 AND expires_at > $2
            ",
        )
        .bind(Coupon::normalize_code(code))
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Create a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, coupon: &NewCoupon) -> Result<Coupon, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(
            r"
            INSERT INTO storefront.coupons (
                code, description, discount, discount_type, for_new_user,
                for_member, is_public, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING code, description, discount, discount_type, for_new_user,
                      for_member, is_public, expires_at, used_count
            ",
        )
        .bind(Coupon::normalize_code(&coupon.code))
        .bind(&coupon.description)
        .bind(coupon.terms.discount)
        .bind(coupon.terms.discount_type.as_str())
        .bind(coupon.rules.for_new_user)
        .bind(coupon.rules.for_member)
        .bind(coupon.is_public)
        .bind(coupon.expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "coupon code already exists"))?;

        Coupon::try_from(row)
    }

    // =========================================================================
    // Transactional writes
    // =========================================================================

    /// Record one redemption.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon no longer exists.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn increment_usage(conn: &mut PgConnection, code: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.coupons SET used_count = used_count + 1 WHERE code = $1",
        )
        .bind(code)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
