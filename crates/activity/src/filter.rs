use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{AccountId, AllocationId, BusinessId};

use crate::activity::{AccountActivity, ActivityStatus, ActivityType};

/// Offset/limit paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { offset: 0, limit: 20 }
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Query over activity rows.
///
/// `allocation_ids`, when present, restricts results to those allocations —
/// the caller passes the set it is permitted to view (permission resolution
/// is an upstream concern). `include_hidden` is the auditor switch: user
/// queries leave it off and respect `hide_after`/`visible_after`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityFilter {
    pub business_id: BusinessId,
    pub account_id: Option<AccountId>,
    pub allocation_ids: Option<Vec<AllocationId>>,
    pub types: Option<Vec<ActivityType>>,
    pub statuses: Option<Vec<ActivityStatus>>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub include_hidden: bool,
    pub page: PageRequest,
}

impl ActivityFilter {
    pub fn for_business(business_id: BusinessId) -> Self {
        Self {
            business_id,
            account_id: None,
            allocation_ids: None,
            types: None,
            statuses: None,
            from: None,
            until: None,
            include_hidden: false,
            page: PageRequest::default(),
        }
    }

    pub fn matches(&self, activity: &AccountActivity, now: DateTime<Utc>) -> bool {
        if activity.business_id != self.business_id {
            return false;
        }
        if let Some(account_id) = self.account_id {
            if activity.account_id != account_id {
                return false;
            }
        }
        if let Some(ref allocation_ids) = self.allocation_ids {
            if !allocation_ids.contains(&activity.allocation_id) {
                return false;
            }
        }
        if let Some(ref types) = self.types {
            if !types.contains(&activity.activity_type) {
                return false;
            }
        }
        if let Some(ref statuses) = self.statuses {
            if !statuses.contains(&activity.status) {
                return false;
            }
        }
        if let Some(from) = self.from {
            if activity.activity_time < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if activity.activity_time >= until {
                return false;
            }
        }
        if !self.include_hidden && !activity.is_visible(now) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tally_core::{ActivityId, Amount, Currency};

    use crate::activity::ActivityDetails;

    fn row(business_id: BusinessId, minutes_ago: i64) -> AccountActivity {
        AccountActivity {
            id: ActivityId::new(),
            business_id,
            allocation_id: AllocationId::new(),
            account_id: AccountId::new(),
            adjustment_id: None,
            hold_id: None,
            activity_type: ActivityType::BankDeposit,
            status: ActivityStatus::Processed,
            amount: Amount::new(Currency::Usd, 100_00),
            requested_amount: Amount::new(Currency::Usd, 100_00),
            activity_time: Utc::now() - Duration::minutes(minutes_ago),
            hide_after: None,
            visible_after: None,
            details: ActivityDetails::BankTransfer {
                bank_name: "First Bank".to_string(),
                last_four: "1234".to_string(),
            },
            version: 0,
        }
    }

    #[test]
    fn filters_by_business() {
        let business = BusinessId::new();
        let filter = ActivityFilter::for_business(business);
        let now = Utc::now();
        assert!(filter.matches(&row(business, 5), now));
        assert!(!filter.matches(&row(BusinessId::new(), 5), now));
    }

    #[test]
    fn filters_by_status_and_type() {
        let business = BusinessId::new();
        let mut filter = ActivityFilter::for_business(business);
        filter.statuses = Some(vec![ActivityStatus::Declined]);
        let now = Utc::now();
        assert!(!filter.matches(&row(business, 5), now));

        filter.statuses = None;
        filter.types = Some(vec![ActivityType::NetworkCapture]);
        assert!(!filter.matches(&row(business, 5), now));
    }

    #[test]
    fn hidden_rows_need_include_hidden() {
        let business = BusinessId::new();
        let now = Utc::now();
        let mut activity = row(business, 5);
        activity.hide_after = Some(now - Duration::minutes(1));

        let mut filter = ActivityFilter::for_business(business);
        assert!(!filter.matches(&activity, now));
        filter.include_hidden = true;
        assert!(filter.matches(&activity, now));
    }

    #[test]
    fn time_window_is_half_open() {
        let business = BusinessId::new();
        let now = Utc::now();
        let activity = row(business, 60);

        let mut filter = ActivityFilter::for_business(business);
        filter.from = Some(activity.activity_time);
        assert!(filter.matches(&activity, now));
        filter.until = Some(activity.activity_time);
        assert!(!filter.matches(&activity, now));
    }
}
