//! Coupon management commands.

use chrono::{Duration, Utc};
use clap::Args;
use rust_decimal::Decimal;
use tracing::info;

use qui_core::{CouponRules, CouponTerms, DiscountType};
use qui_storefront::db::{CouponRepository, NewCoupon, RepositoryError};

use super::{CommandError, connect};

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Code customers type at checkout (stored uppercase)
    #[arg(short, long)]
    pub code: String,

    /// Percentage (0-100) or flat amount
    #[arg(short, long)]
    pub discount: Decimal,

    /// `percentage` or `flat`
    #[arg(short = 't', long = "type", default_value = "percentage")]
    pub discount_type: DiscountType,

    /// Shown to customers when the coupon is applied
    #[arg(long, default_value = "")]
    pub description: String,

    /// Only for customers without previous orders
    #[arg(long)]
    pub new_user: bool,

    /// Only for plus-plan members
    #[arg(long)]
    pub member: bool,

    /// List the coupon publicly
    #[arg(long)]
    pub public: bool,

    /// Days until the coupon expires
    #[arg(long, default_value_t = 30)]
    pub expires_in_days: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum CouponCommandError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Invalid coupon: {0}")]
    Invalid(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CreateArgs {
    fn to_new_coupon(&self) -> Result<NewCoupon, CouponCommandError> {
        if self.code.trim().is_empty() {
            return Err(CouponCommandError::Invalid("code is empty".to_string()));
        }
        if self.discount.is_sign_negative() {
            return Err(CouponCommandError::Invalid("discount is negative".to_string()));
        }
        if self.discount_type == DiscountType::Percentage && self.discount > Decimal::ONE_HUNDRED {
            return Err(CouponCommandError::Invalid(
                "percentage discount above 100".to_string(),
            ));
        }
        if self.expires_in_days <= 0 {
            return Err(CouponCommandError::Invalid(
                "expiry must be in the future".to_string(),
            ));
        }

        Ok(NewCoupon {
            code: self.code.clone(),
            description: self.description.clone(),
            terms: CouponTerms {
                discount: self.discount,
                discount_type: self.discount_type,
            },
            rules: CouponRules {
                for_new_user: self.new_user,
                for_member: self.member,
            },
            is_public: self.public,
            expires_at: Utc::now() + Duration::days(self.expires_in_days),
        })
    }
}

/// Create a coupon.
///
/// # Errors
///
/// Returns an error if the arguments are invalid, the code already exists,
/// or the database is unreachable.
pub async fn create(args: CreateArgs) -> Result<(), CouponCommandError> {
    let coupon = args.to_new_coupon()?;
    let pool = connect().await?;

    let created = CouponRepository::new(&pool).create(&coupon).await?;
    info!(
        code = %created.code,
        expires_at = %created.expires_at,
        "Coupon created"
    );

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: CreateArgs,
    }

    fn parse(argv: &[&str]) -> CreateArgs {
        TestCli::try_parse_from(std::iter::once("qui-cli").chain(argv.iter().copied()))
            .unwrap()
            .args
    }

    #[test]
    fn test_flat_coupon_from_args() {
        let args = parse(&["-c", "save20", "-d", "20", "-t", "flat", "--member"]);
        let coupon = args.to_new_coupon().unwrap();
        assert_eq!(coupon.terms.discount_type, DiscountType::Flat);
        assert_eq!(coupon.terms.discount, Decimal::from(20));
        assert!(coupon.rules.for_member);
        assert!(!coupon.rules.for_new_user);
        assert!(coupon.expires_at > Utc::now());
    }

    #[test]
    fn test_rejects_percentage_over_hundred() {
        let args = parse(&["-c", "TOOMUCH", "-d", "150"]);
        assert!(matches!(
            args.to_new_coupon(),
            Err(CouponCommandError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_past_expiry() {
        let args = parse(&["-c", "OLD", "-d", "5", "--expires-in-days", "0"]);
        assert!(args.to_new_coupon().is_err());
    }
}
