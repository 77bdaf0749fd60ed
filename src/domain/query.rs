use super::payout::{PayoutRequest, PayoutStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Filters for listing payouts. Pages are 1-based; `requested_from` is inclusive and
/// `requested_to` exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutQuery {
    pub owner_id: Option<String>,
    pub status: Option<PayoutStatus>,
    pub requested_from: Option<DateTime<Utc>>,
    pub requested_to: Option<DateTime<Utc>>,
    pub page: u32,
    pub limit: u32,
}

impl Default for PayoutQuery {
    fn default() -> Self {
        Self {
            owner_id: None,
            status: None,
            requested_from: None,
            requested_to: None,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PayoutQuery {
    pub fn for_owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: PayoutStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.requested_from = Some(from);
        self.requested_to = Some(to);
        self
    }

    pub fn page(mut self, page: u32, limit: u32) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    pub fn matches(&self, payout: &PayoutRequest) -> bool {
        self.owner_id
            .as_deref()
            .is_none_or(|owner| payout.owner_id == owner)
            && self.status.is_none_or(|status| payout.status == status)
            && self
                .requested_from
                .is_none_or(|from| payout.requested_at >= from)
            && self.requested_to.is_none_or(|to| payout.requested_at < to)
    }

    /// Applies the filters, orders newest first and cuts the requested page.
    pub fn apply(&self, payouts: impl IntoIterator<Item = PayoutRequest>) -> Page<PayoutRequest> {
        let mut matching: Vec<PayoutRequest> =
            payouts.into_iter().filter(|p| self.matches(p)).collect();
        matching.sort_by(|a, b| {
            b.requested_at
                .cmp(&a.requested_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Page::paginate(matching, self.page, self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Slices an already ordered collection. A zero page is read as the first page and
    /// the limit is clamped to `1..=MAX_PAGE_LIMIT`.
    pub fn paginate(items: Vec<T>, page: u32, limit: u32) -> Self {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        let total = items.len();
        let total_pages = total.div_ceil(limit as usize) as u32;
        let skip = (page as usize - 1).saturating_mul(limit as usize);

        let items = items.into_iter().skip(skip).take(limit as usize).collect();
        Self {
            items,
            page,
            limit,
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusTotal {
    pub status: PayoutStatus,
    pub count: usize,
    pub amount: Decimal,
}

/// Per-status counts and amounts for the admin payout overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoutSummary {
    pub by_status: Vec<StatusTotal>,
}

impl PayoutSummary {
    pub fn from_payouts<'a>(payouts: impl IntoIterator<Item = &'a PayoutRequest>) -> Self {
        let mut by_status: Vec<StatusTotal> = PayoutStatus::ALL
            .into_iter()
            .map(|status| StatusTotal {
                status,
                count: 0,
                amount: Decimal::ZERO,
            })
            .collect();
        for payout in payouts {
            if let Some(total) = by_status.iter_mut().find(|t| t.status == payout.status) {
                total.count += 1;
                total.amount += payout.amount.value();
            }
        }
        Self { by_status }
    }

    pub fn get(&self, status: PayoutStatus) -> &StatusTotal {
        // by_status holds every status, in PayoutStatus::ALL order.
        let index = PayoutStatus::ALL
            .iter()
            .position(|s| *s == status)
            .unwrap_or_default();
        &self.by_status[index]
    }

    /// Money committed to payouts that have not reached a terminal state.
    pub fn outstanding(&self) -> Decimal {
        [
            PayoutStatus::Pending,
            PayoutStatus::Otp,
            PayoutStatus::Processing,
            PayoutStatus::Failed,
        ]
        .into_iter()
        .map(|status| self.get(status).amount)
        .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Amount;
    use crate::domain::payout::BankDetails;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn payout_at(owner: &str, day: u32) -> PayoutRequest {
        PayoutRequest::new(
            owner,
            Amount::new(dec!(1000)).unwrap(),
            BankDetails::new("Ada Obi", "0123456789", "058").unwrap(),
            Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_paginate_counts_pages() {
        let page = Page::paginate((1..=45).collect(), 3, 20);
        assert_eq!(page.items, (41..=45).collect::<Vec<_>>());
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_paginate_empty_and_out_of_range() {
        let empty: Page<u8> = Page::paginate(Vec::new(), 1, 20);
        assert_eq!(empty.total_pages, 0);
        assert!(empty.items.is_empty());

        let beyond = Page::paginate(vec![1, 2, 3], 5, 2);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_pages, 2);
    }

    #[test]
    fn test_paginate_clamps_arguments() {
        let page = Page::paginate(vec![1, 2, 3], 0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 1);
        assert_eq!(page.items, vec![1]);
    }

    #[test]
    fn test_query_filters_and_orders_newest_first() {
        let mut completed = payout_at("alice", 3);
        completed.complete_manually("REF", Utc::now()).unwrap();
        let payouts = vec![
            payout_at("alice", 1),
            completed,
            payout_at("alice", 5),
            payout_at("bob", 4),
        ];

        let page = PayoutQuery::for_owner("alice").apply(payouts.clone());
        let days: Vec<_> = page
            .items
            .iter()
            .map(|p| p.requested_at.format("%d").to_string())
            .collect();
        assert_eq!(days, vec!["05", "03", "01"]);

        let pending = PayoutQuery::for_owner("alice")
            .with_status(PayoutStatus::Pending)
            .apply(payouts.clone());
        assert_eq!(pending.total, 2);

        let from = Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap();
        let ranged = PayoutQuery::default()
            .between(from, from + Duration::days(2))
            .apply(payouts);
        assert_eq!(ranged.total, 2);
    }

    #[test]
    fn test_summary_totals() {
        let mut completed = payout_at("alice", 2);
        completed.complete_manually("REF", Utc::now()).unwrap();
        let payouts = [payout_at("alice", 1), payout_at("bob", 1), completed];

        let summary = PayoutSummary::from_payouts(&payouts);
        assert_eq!(summary.by_status.len(), PayoutStatus::ALL.len());
        assert_eq!(summary.get(PayoutStatus::Pending).count, 2);
        assert_eq!(summary.get(PayoutStatus::Pending).amount, dec!(2000));
        assert_eq!(summary.get(PayoutStatus::Completed).count, 1);
        assert_eq!(summary.get(PayoutStatus::Failed).count, 0);
        assert_eq!(summary.outstanding(), dec!(2000));
    }
}
