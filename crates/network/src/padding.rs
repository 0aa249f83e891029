//! Authorization hold sizing.
//!
//! Some merchant categories settle for more than they authorize (tips,
//! fuel pumps, incidentals), so the hold is padded and its lifetime varies
//! by category.

use chrono::{DateTime, Duration, Utc};

use tally_core::{Amount, DomainResult};

use crate::merchant::MerchantType;

/// How a pre-authorization should be reserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldPlan {
    /// Negative: the amount to reserve.
    pub amount: Amount,
    pub expires_at: DateTime<Utc>,
    /// Whether a smaller-than-requested approval is acceptable.
    pub allow_partial_approval: bool,
}

/// Pad the requested (negative) amount and pick the hold lifetime.
///
/// Fuel dispensers reserve a flat 100.00 for up to two hours and can never
/// be partially approved; travel categories pad 15% and live a week;
/// restaurants, bars and taxis pad 20% for three days; everything else
/// holds the face amount for five days. `partial_approval_allowed` is what
/// the network offered for this authorization.
pub fn plan_authorization_hold(
    requested: &Amount,
    merchant_type: MerchantType,
    partial_approval_allowed: bool,
    now: DateTime<Utc>,
) -> DomainResult<HoldPlan> {
    requested.ensure_negative()?;

    let plan = match merchant_type {
        MerchantType::AutomatedFuelDispensers => HoldPlan {
            amount: Amount::new(
                requested.currency(),
                -100 * 10i64.pow(requested.currency().decimal_scale()),
            ),
            expires_at: now + Duration::hours(2),
            allow_partial_approval: false,
        },
        MerchantType::AirlinesAirCarriers
        | MerchantType::CarRentalAgencies
        | MerchantType::CruiseLines
        | MerchantType::HotelsMotelsAndResorts => HoldPlan {
            amount: requested.percent_of(115),
            expires_at: now + Duration::weeks(1),
            allow_partial_approval: partial_approval_allowed,
        },
        MerchantType::DrinkingPlaces
        | MerchantType::EatingPlacesRestaurants
        | MerchantType::FastFoodRestaurants
        | MerchantType::TaxicabsLimousines => HoldPlan {
            amount: requested.percent_of(120),
            expires_at: now + Duration::days(3),
            allow_partial_approval: partial_approval_allowed,
        },
        MerchantType::Other => HoldPlan {
            amount: *requested,
            expires_at: now + Duration::days(5),
            allow_partial_approval: partial_approval_allowed,
        },
    };

    plan.amount.ensure_negative()?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::Currency;

    fn usd(units: i64) -> Amount {
        Amount::new(Currency::Usd, units)
    }

    #[test]
    fn fuel_holds_are_flat_short_and_never_partial() {
        let now = Utc::now();
        let plan = plan_authorization_hold(
            &usd(-1_00),
            MerchantType::AutomatedFuelDispensers,
            true,
            now,
        )
        .unwrap();
        assert_eq!(plan.amount, usd(-100_00));
        assert_eq!(plan.expires_at, now + Duration::hours(2));
        assert!(!plan.allow_partial_approval);
    }

    #[test]
    fn restaurants_pad_twenty_percent() {
        let now = Utc::now();
        let plan = plan_authorization_hold(
            &usd(-50_00),
            MerchantType::EatingPlacesRestaurants,
            false,
            now,
        )
        .unwrap();
        assert_eq!(plan.amount, usd(-60_00));
        assert_eq!(plan.expires_at, now + Duration::days(3));
    }

    #[test]
    fn travel_pads_fifteen_percent_for_a_week() {
        let now = Utc::now();
        let plan = plan_authorization_hold(
            &usd(-200_00),
            MerchantType::HotelsMotelsAndResorts,
            false,
            now,
        )
        .unwrap();
        assert_eq!(plan.amount, usd(-230_00));
        assert_eq!(plan.expires_at, now + Duration::weeks(1));
    }

    #[test]
    fn default_holds_face_amount_for_five_days() {
        let now = Utc::now();
        let plan = plan_authorization_hold(&usd(-30_00), MerchantType::Other, true, now).unwrap();
        assert_eq!(plan.amount, usd(-30_00));
        assert_eq!(plan.expires_at, now + Duration::days(5));
        assert!(plan.allow_partial_approval);
    }

    #[test]
    fn positive_request_is_rejected() {
        assert!(
            plan_authorization_hold(&usd(30_00), MerchantType::Other, false, Utc::now()).is_err()
        );
    }
}
