//! Status derivation (spec §4.3): derives `status` from events + the
//! upstream-supplied status. All comparisons are UTC, day granularity.

use chrono::NaiveDate;

use ac_domain::model::Event;

pub const ON_TOUR: &str = "on tour";
pub const TOUR_PLANNED: &str = "tour planned";

/// `today` anchors the day-granularity comparisons in spec §4.3.
pub fn derive_status(events: &[Event], upstream_status: &str, today: NaiveDate) -> String {
    let earliest = events
        .iter()
        .filter_map(|e| NaiveDate::parse_from_str(&e.date, "%Y-%m-%d").ok())
        .min();

    let Some(earliest) = earliest else {
        return upstream_status.to_owned();
    };

    let days_out = (earliest - today).num_days();
    if days_out <= 90 {
        ON_TOUR.to_owned()
    } else if days_out <= 270 {
        TOUR_PLANNED.to_owned()
    } else {
        upstream_status.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_domain::model::{Address, Location};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 27).unwrap()
    }

    fn event_on(date: &str) -> Event {
        Event {
            name: "Show".into(),
            date: date.into(),
            local_time: None,
            url: None,
            location: Location { address: Address::default(), geo: None },
        }
    }

    #[test]
    fn empty_events_preserves_upstream_status() {
        assert_eq!(derive_status(&[], "split-up", today()), "split-up");
    }

    #[test]
    fn earliest_within_90_days_is_on_tour() {
        let events = vec![event_on("2026-10-01")]; // 66 days out
        assert_eq!(derive_status(&events, "active", today()), ON_TOUR);
    }

    #[test]
    fn earliest_between_91_and_270_days_is_tour_planned() {
        let events = vec![event_on("2027-02-01")]; // ~189 days out
        assert_eq!(derive_status(&events, "active", today()), TOUR_PLANNED);
    }

    #[test]
    fn earliest_past_270_days_preserves_upstream_status() {
        let events = vec![event_on("2027-12-01")]; // ~490 days out
        assert_eq!(derive_status(&events, "active", today()), "active");
    }

    #[test]
    fn picks_the_earliest_of_multiple_events() {
        let events = vec![event_on("2027-12-01"), event_on("2026-10-01")];
        assert_eq!(derive_status(&events, "active", today()), ON_TOUR);
    }

    #[test]
    fn boundary_at_exactly_90_days_is_on_tour() {
        let boundary = today() + chrono::Duration::days(90);
        let events = vec![event_on(&boundary.format("%Y-%m-%d").to_string())];
        assert_eq!(derive_status(&events, "active", today()), ON_TOUR);
    }

    #[test]
    fn boundary_at_exactly_271_days_preserves_upstream_status() {
        let boundary = today() + chrono::Duration::days(271);
        let events = vec![event_on(&boundary.format("%Y-%m-%d").to_string())];
        assert_eq!(derive_status(&events, "active", today()), "active");
    }
}
