//! Report dashboard aggregation.
//!
//! Turns fetched items, users and approval messages into the numbers and
//! chart series shown on the reports page. Pure and synchronous so the web
//! handler only has to fetch and render.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;

use crate::records::{ContrabandItem, Message, UserProfile};
use crate::types::{CategoryId, ItemStatus, MessageType, UserId};

/// Chart palette, assigned to series in order.
pub const COLORS: [&str; 6] = [
    "#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#8884D8", "#82CA9D",
];

/// How many officers the leaderboard shows.
pub const TOP_OFFICERS: usize = 5;

fn color(index: usize) -> &'static str {
    COLORS.get(index % COLORS.len()).copied().unwrap_or("#888888")
}

/// Inclusive seizure-date window of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportRange {
    /// From the first day of the month six months before `now`, up to `now`.
    #[must_use]
    pub fn default_for(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let start = today
            .with_day(1)
            .and_then(|first| first.checked_sub_months(Months::new(6)))
            .unwrap_or(today);
        Self {
            start: start.and_time(NaiveTime::MIN).and_utc(),
            end: now,
        }
    }

    /// Build a range from optional form dates, falling back to the default
    /// window for missing bounds. The end date includes the whole day.
    #[must_use]
    pub fn from_dates(from: Option<NaiveDate>, to: Option<NaiveDate>, now: DateTime<Utc>) -> Self {
        let fallback = Self::default_for(now);
        let start = from.map_or(fallback.start, |d| d.and_time(NaiveTime::MIN).and_utc());
        let end = to
            .and_then(|d| d.succ_opt())
            .map_or(fallback.end, |next| {
                next.and_time(NaiveTime::MIN).and_utc() - chrono::Duration::nanoseconds(1)
            });
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Seizures of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySlice {
    pub name: String,
    pub count: usize,
    pub value: Decimal,
    pub color: &'static str,
}

/// Seizures registered in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBucket {
    /// `Mon YYYY`, e.g. `Mar 2024`.
    pub label: String,
    pub count: usize,
    pub value: Decimal,
}

/// Items currently in one status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSlice {
    pub status: ItemStatus,
    /// Uppercase chart label, e.g. `IN CUSTODY`.
    pub label: String,
    pub count: usize,
    pub color: &'static str,
}

/// One row of the officer leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfficerTally {
    pub name: String,
    pub badge: Option<String>,
    pub seizures: usize,
    pub value: Decimal,
}

/// Everything the reports page shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportData {
    pub total_seizures: usize,
    pub total_value: Decimal,
    pub active_users: usize,
    pub pending_approvals: usize,
    pub by_category: Vec<CategorySlice>,
    pub by_month: Vec<MonthBucket>,
    pub by_status: Vec<StatusSlice>,
    pub top_officers: Vec<OfficerTally>,
}

impl ReportData {
    /// Aggregate a report.
    ///
    /// Items are narrowed to `range` (by seizure date) and, when given, to
    /// `category`. Users count when active. Messages count as pending
    /// approvals when they are approval requests that require a response.
    #[must_use]
    pub fn build(
        items: &[ContrabandItem],
        users: &[UserProfile],
        messages: &[Message],
        range: &ReportRange,
        category: Option<CategoryId>,
    ) -> Self {
        let selected: Vec<&ContrabandItem> = items
            .iter()
            .filter(|item| range.contains(item.seizure_date))
            .filter(|item| category.is_none() || item.category_id == category)
            .collect();

        Self {
            total_seizures: selected.len(),
            total_value: selected.iter().map(|item| value_of(item)).sum(),
            active_users: users.iter().filter(|u| u.is_active).count(),
            pending_approvals: messages
                .iter()
                .filter(|m| m.message_type == MessageType::ApprovalRequest && m.requires_response)
                .count(),
            by_category: by_category(&selected),
            by_month: by_month(&selected),
            by_status: by_status(&selected),
            top_officers: top_officers(&selected),
        }
    }

    /// Largest category count, for scaling bars.
    #[must_use]
    pub fn max_category_count(&self) -> usize {
        self.by_category.iter().map(|c| c.count).max().unwrap_or(0)
    }

    /// Largest monthly count, for scaling bars.
    #[must_use]
    pub fn max_month_count(&self) -> usize {
        self.by_month.iter().map(|m| m.count).max().unwrap_or(0)
    }
}

fn value_of(item: &ContrabandItem) -> Decimal {
    item.estimated_value.unwrap_or(Decimal::ZERO)
}

fn by_category(items: &[&ContrabandItem]) -> Vec<CategorySlice> {
    let mut groups: HashMap<&str, (usize, Decimal)> = HashMap::new();
    for item in items {
        let name = item.category.as_ref().map_or("Unknown", |c| c.name.as_str());
        let entry = groups.entry(name).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += value_of(item);
    }

    let mut slices: Vec<(&str, usize, Decimal)> =
        groups.into_iter().map(|(name, (count, value))| (name, count, value)).collect();
    slices.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    slices
        .into_iter()
        .enumerate()
        .map(|(index, (name, count, value))| CategorySlice {
            name: name.to_owned(),
            count,
            value,
            color: color(index),
        })
        .collect()
}

fn by_month(items: &[&ContrabandItem]) -> Vec<MonthBucket> {
    let mut months: BTreeMap<(i32, u32), (usize, Decimal)> = BTreeMap::new();
    for item in items {
        let key = (item.seizure_date.year(), item.seizure_date.month());
        let entry = months.entry(key).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += value_of(item);
    }

    months
        .into_iter()
        .filter_map(|((year, month), (count, value))| {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            Some(MonthBucket {
                label: first.format("%b %Y").to_string(),
                count,
                value,
            })
        })
        .collect()
}

fn by_status(items: &[&ContrabandItem]) -> Vec<StatusSlice> {
    ItemStatus::ALL
        .into_iter()
        .map(|status| (status, items.iter().filter(|i| i.status == status).count()))
        .filter(|(_, count)| *count > 0)
        .enumerate()
        .map(|(index, (status, count))| StatusSlice {
            status,
            label: status.chart_label(),
            count,
            color: color(index),
        })
        .collect()
}

/// Seizures and value per seizing officer, keyed by account so officers
/// sharing a name are ranked separately.
fn top_officers(items: &[&ContrabandItem]) -> Vec<OfficerTally> {
    let mut tallies: HashMap<UserId, OfficerTally> = HashMap::new();
    for item in items {
        let (Some(id), Some(officer)) = (item.seized_by, item.seized_by_user.as_ref()) else {
            continue;
        };
        let tally = tallies
            .entry(id)
            .or_insert_with(|| OfficerTally {
                name: officer.full_name.clone(),
                badge: officer.badge_number.clone(),
                seizures: 0,
                value: Decimal::ZERO,
            });
        tally.seizures += 1;
        tally.value += value_of(item);
    }

    let mut ranked: Vec<OfficerTally> = tallies.into_values().collect();
    ranked.sort_by(|a, b| {
        b.seizures
            .cmp(&a.seizures)
            .then_with(|| b.value.cmp(&a.value))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(TOP_OFFICERS);
    ranked
}

/// Width of a bar as a whole percentage of `max`.
#[must_use]
pub fn bar_percent(count: usize, max: usize) -> usize {
    if max == 0 {
        return 0;
    }
    (count * 100).div_ceil(max).min(100)
}

/// Format an amount in Ethiopian birr, e.g. `ETB 1,234,567.50`.
#[must_use]
pub fn format_etb(amount: Decimal) -> String {
    let fixed = format!("{:.2}", amount.round_dp(2));
    let (sign, digits) = fixed
        .strip_prefix('-')
        .map_or(("", fixed.as_str()), |rest| ("-", rest));
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("ETB {sign}{grouped}.{fraction}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::filter::fixtures::{item, message, officer};
    use crate::types::Role;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_range_starts_six_months_back() {
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let range = ReportRange::default_for(now);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2023, 9, 1, 0, 0, 0).unwrap());
        assert_eq!(range.end, now);
    }

    #[test]
    fn test_from_dates_includes_whole_end_day() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let range = ReportRange::from_dates(
            NaiveDate::from_ymd_opt(2024, 2, 1),
            NaiveDate::from_ymd_opt(2024, 2, 29),
            now,
        );
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_build_aggregates() {
        let abebe = officer("Abebe Kebede", Role::FieldOfficer, "FO-101");
        let sara = officer("Sara Tesfaye", Role::FieldOfficer, "FO-102");
        let mut retired = officer("Old Timer", Role::Supervisor, "SV-9");
        retired.is_active = false;
        let drugs = CategoryId::generate();
        let weapons = CategoryId::generate();

        let items = vec![
            item("CMS-1", "Cocaine", ItemStatus::Seized, &abebe, Some(("Drugs", drugs)), dec("1000.50"), 1),
            item("CMS-2", "Heroin", ItemStatus::InCustody, &abebe, Some(("Drugs", drugs)), dec("500"), 1),
            item("CMS-3", "Rifle", ItemStatus::InCustody, &sara, Some(("Weapons", weapons)), dec("250"), 3),
            item("CMS-4", "Unknown", ItemStatus::Seized, &sara, None, dec("0"), 3),
        ];

        let mut approval = message(&sara, &abebe, "Destroy CMS-1?");
        approval.message_type = MessageType::ApprovalRequest;
        approval.requires_response = true;
        let messages = vec![approval, message(&abebe, &sara, "FYI")];

        let range = ReportRange {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
        };
        let report = ReportData::build(
            &items,
            &[abebe.clone(), sara.clone(), retired],
            &messages,
            &range,
            None,
        );

        assert_eq!(report.total_seizures, 4);
        assert_eq!(report.total_value, dec("1750.50"));
        assert_eq!(report.active_users, 2);
        assert_eq!(report.pending_approvals, 1);

        assert_eq!(report.by_category[0].name, "Drugs");
        assert_eq!(report.by_category[0].count, 2);
        assert_eq!(report.by_category[0].color, "#0088FE");
        assert!(report.by_category.iter().any(|c| c.name == "Unknown"));

        let months: Vec<_> = report.by_month.iter().map(|m| (m.label.as_str(), m.count)).collect();
        assert_eq!(months, vec![("Jan 2024", 2), ("Mar 2024", 2)]);

        let statuses: Vec<_> = report.by_status.iter().map(|s| (s.label.as_str(), s.count)).collect();
        assert_eq!(statuses, vec![("SEIZED", 2), ("IN CUSTODY", 2)]);

        // Tied on count; Abebe wins on value.
        assert_eq!(report.top_officers[0].name, "Abebe Kebede");
        assert_eq!(report.top_officers[0].badge.as_deref(), Some("FO-101"));
        assert_eq!(report.top_officers[1].seizures, 2);
    }

    #[test]
    fn test_officers_sharing_a_name_are_ranked_apart() {
        let senior = officer("Abebe Kebede", Role::FieldOfficer, "FO-101");
        let junior = officer("Abebe Kebede", Role::FieldOfficer, "FO-377");
        let items = vec![
            item("CMS-1", "Cocaine", ItemStatus::Seized, &senior, None, dec("100"), 1),
            item("CMS-2", "Heroin", ItemStatus::Seized, &senior, None, dec("100"), 1),
            item("CMS-3", "Rifle", ItemStatus::Seized, &junior, None, dec("900"), 2),
        ];
        let range = ReportRange {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
        };
        let report = ReportData::build(&items, &[senior, junior], &[], &range, None);

        let ranked: Vec<_> = report
            .top_officers
            .iter()
            .map(|t| (t.name.as_str(), t.badge.as_deref(), t.seizures))
            .collect();
        assert_eq!(
            ranked,
            vec![
                ("Abebe Kebede", Some("FO-101"), 2),
                ("Abebe Kebede", Some("FO-377"), 1),
            ]
        );
    }

    #[test]
    fn test_build_respects_range_and_category() {
        let abebe = officer("Abebe Kebede", Role::FieldOfficer, "FO-101");
        let drugs = CategoryId::generate();
        let items = vec![
            item("CMS-1", "Cocaine", ItemStatus::Seized, &abebe, Some(("Drugs", drugs)), dec("10"), 1),
            item("CMS-2", "Rifle", ItemStatus::Seized, &abebe, None, dec("20"), 1),
            item("CMS-3", "Cocaine", ItemStatus::Seized, &abebe, Some(("Drugs", drugs)), dec("30"), 8),
        ];
        let range = ReportRange {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap(),
        };
        let report = ReportData::build(&items, &[], &[], &range, Some(drugs));
        assert_eq!(report.total_seizures, 1);
        assert_eq!(report.total_value, dec("10"));
    }

    #[test]
    fn test_top_officers_capped_at_five() {
        let officers: Vec<_> = (0..7)
            .map(|i| officer(&format!("Officer {i}"), Role::FieldOfficer, &format!("FO-{i}")))
            .collect();
        let items: Vec<_> = officers
            .iter()
            .map(|o| item("CMS", "Khat", ItemStatus::Seized, o, None, Decimal::ONE, 2))
            .collect();
        let range = ReportRange {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
        };
        let report = ReportData::build(&items, &[], &[], &range, None);
        assert_eq!(report.top_officers.len(), TOP_OFFICERS);
        assert_eq!(report.top_officers[0].name, "Officer 0");
    }

    #[test]
    fn test_format_etb() {
        assert_eq!(format_etb(dec("0")), "ETB 0.00");
        assert_eq!(format_etb(dec("999.5")), "ETB 999.50");
        assert_eq!(format_etb(dec("1234567.891")), "ETB 1,234,567.89");
        assert_eq!(format_etb(dec("-1500")), "ETB -1,500.00");
    }

    #[test]
    fn test_bar_percent() {
        assert_eq!(bar_percent(0, 0), 0);
        assert_eq!(bar_percent(5, 10), 50);
        assert_eq!(bar_percent(1, 3), 34);
        assert_eq!(bar_percent(10, 10), 100);
    }
}
