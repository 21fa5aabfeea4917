// src/punch_tests.rs

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::pay_period::*;
    use crate::punch::*;
    use crate::store::DataStore;
    use crate::time_format::ClockTime;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use rust_decimal::prelude::*;
    use rust_decimal_macros::dec;
    use crate::report::{report_path, PayPeriodReport, ReportRenderer};
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::{tempdir, TempDir};

    // Keeps rendered reports in memory instead of writing files.
    #[derive(Default)]
    struct MemoryRenderer {
        rendered: RefCell<Vec<(PayPeriodReport, PathBuf)>>,
    }

    impl ReportRenderer for MemoryRenderer {
        fn render(&self, report: &PayPeriodReport, path: &Path) -> Result<PathBuf, AppError> {
            self.rendered
                .borrow_mut()
                .push((report.clone(), path.to_path_buf()));
            Ok(path.to_path_buf())
        }
    }

    // Helper: a service over a fresh data file with `Peter` logged in.
    fn setup_service() -> (PunchService, TempDir) {
        let dir = tempdir().expect("tempdir");
        let store = DataStore::new(dir.path().join("data.json"));
        let (mut service, load_error) = PunchService::open(store, default_first_period_start());
        assert!(load_error.is_none());
        service.login("Peter").expect("login");
        (service, dir)
    }

    fn at(datetime_str: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_else(|_| panic!("Invalid datetime string format: {}", datetime_str))
    }

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn current(service: &PunchService) -> PayPeriod {
        service
            .current_period("Peter")
            .expect("user exists")
            .expect("open period")
            .clone()
    }

    fn reload(service: &PunchService) -> TimeDocument {
        let loaded = service.store().load();
        assert!(loaded.error.is_none(), "reload failed: {:?}", loaded.error);
        loaded.document
    }

    fn six_hour_entry() -> FinalDayEntry {
        FinalDayEntry::new("9:00 AM", "12:00 PM", Some("1:00 PM"), Some("4:00 PM"))
    }

    // --- Login & periods ---

    #[test]
    fn test_login_creates_user_with_first_period() {
        let (service, _dir) = setup_service();
        let period = current(&service);
        assert_eq!(period.start_date, d("2025-02-17"));
        assert_eq!(period.end_date, d("2025-02-28"));
        assert_eq!(service.user_names(), vec!["Peter".to_string()]);
        assert_eq!(reload(&service), *service.document());
    }

    #[test]
    fn test_login_trims_and_requires_a_name() {
        let (mut service, _dir) = setup_service();
        assert!(matches!(service.login("   "), Err(AppError::InputRequired(_))));
        service.login("  Dana ").unwrap();
        assert!(service.user("Dana").is_ok());
        assert!(service.user("dana").is_err(), "names are case-sensitive");
    }

    #[test]
    fn test_login_is_idempotent() {
        let (mut service, _dir) = setup_service();
        service.punch_in("Peter", at("2025-02-17 08:00:00")).unwrap();
        let before = service.document().clone();
        service.login("Peter").unwrap();
        assert_eq!(*service.document(), before);
    }

    #[test]
    fn test_unknown_user_cannot_punch() {
        let (mut service, _dir) = setup_service();
        assert!(matches!(
            service.punch_in("Nobody", at("2025-02-17 08:00:00")),
            Err(AppError::UnknownUser(_))
        ));
    }

    // --- Punch in / out ---

    #[test]
    fn test_punch_in_records_open_cycle_and_persists() {
        let (mut service, _dir) = setup_service();
        let stamp = service.punch_in("Peter", at("2025-02-17 08:03:41")).unwrap();
        assert_eq!(stamp.label(), "8:03 AM");

        let period = current(&service);
        assert_eq!(period.day_state(d("2025-02-17")), DayState::Open);
        assert_eq!(reload(&service), *service.document());
    }

    #[test]
    fn test_punch_out_duration_is_elapsed_hours() {
        let (mut service, _dir) = setup_service();
        service.punch_in("Peter", at("2025-02-17 08:00:00")).unwrap();
        let cycle = service.punch_out("Peter", at("2025-02-17 11:30:00")).unwrap();
        assert_eq!(cycle.punch_out.map(|t| t.label()).as_deref(), Some("11:30 AM"));
        assert_eq!(cycle.duration, Some(3.5));
        assert_eq!(day_total(&current(&service), d("2025-02-17")), 3.5);
    }

    #[test]
    fn test_punch_out_counts_seconds_past_the_minute() {
        let (mut service, _dir) = setup_service();
        service.punch_in("Peter", at("2025-02-18 09:15:59")).unwrap();
        let cycle = service.punch_out("Peter", at("2025-02-18 10:15:36")).unwrap();
        // punch-in is stored at 9:15:00
        let expected = 1.0 + 36.0 / 3600.0;
        assert!((cycle.hours() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_punch_out_before_punch_in_clamps_to_zero() {
        let (mut service, _dir) = setup_service();
        service.punch_in("Peter", at("2025-02-19 10:00:00")).unwrap();
        let cycle = service.punch_out("Peter", at("2025-02-19 09:00:00")).unwrap();
        assert_eq!(cycle.duration, Some(0.0));
    }

    #[test]
    fn test_punch_in_twice_is_a_sequence_error() {
        let (mut service, _dir) = setup_service();
        service.punch_in("Peter", at("2025-02-17 08:00:00")).unwrap();
        let before = service.document().clone();
        let err = service.punch_in("Peter", at("2025-02-17 08:30:00")).unwrap_err();
        assert!(matches!(err, AppError::SequenceError(_)));
        assert_eq!(*service.document(), before);
    }

    #[test]
    fn test_punch_out_without_open_cycle_is_a_sequence_error() {
        let (mut service, _dir) = setup_service();
        let err = service.punch_out("Peter", at("2025-02-17 08:00:00")).unwrap_err();
        assert!(matches!(err, AppError::SequenceError(_)));
        assert!(current(&service).records.is_empty());

        service.punch_in("Peter", at("2025-02-17 08:00:00")).unwrap();
        service.punch_out("Peter", at("2025-02-17 12:00:00")).unwrap();
        let err = service.punch_out("Peter", at("2025-02-17 12:05:00")).unwrap_err();
        assert!(matches!(err, AppError::SequenceError(_)));
    }

    #[test]
    fn test_third_punch_in_hits_the_limit() {
        let (mut service, _dir) = setup_service();
        service.punch_in("Peter", at("2025-02-20 08:00:00")).unwrap();
        service.punch_out("Peter", at("2025-02-20 12:00:00")).unwrap();
        service.punch_in("Peter", at("2025-02-20 13:00:00")).unwrap();
        service.punch_out("Peter", at("2025-02-20 17:00:00")).unwrap();
        assert_eq!(current(&service).day_state(d("2025-02-20")), DayState::Full);

        let before = service.document().clone();
        let err = service.punch_in("Peter", at("2025-02-20 17:30:00")).unwrap_err();
        assert!(matches!(err, AppError::LimitReached));
        assert_eq!(*service.document(), before);
        assert_eq!(day_total(&current(&service), d("2025-02-20")), 8.0);
    }

    #[test]
    fn test_weekend_punch_in_is_always_blocked() {
        let (mut service, _dir) = setup_service();
        // even a (hand-edited) open cycle on Saturday does not matter
        {
            let mut doc = service.document().clone();
            let period = doc
                .user_mut("Peter")
                .and_then(UserRecord::current_period_mut)
                .unwrap();
            period.records.insert(
                d("2025-02-22"),
                DayLog::Cycles(vec![PunchCycle::open(ClockTime::parse("9:00 AM").unwrap())]),
            );
            service = PunchService::new(service.store().clone(), doc, default_first_period_start());
        }
        for stamp in ["2025-02-22 09:00:00", "2025-02-23 09:00:00", "2025-03-01 07:00:00"] {
            let err = service.punch_in("Peter", at(stamp)).unwrap_err();
            assert!(
                matches!(err, AppError::WeekendBlocked(date) if date == at(stamp).date()),
                "{} should be blocked, got {:?}",
                stamp,
                err
            );
        }
    }

    // --- Finalize ---

    #[test]
    fn test_finalize_two_pairs_gives_six_hours() {
        let (mut service, _dir) = setup_service();
        service.punch_in("Peter", at("2025-02-17 08:00:00")).unwrap();
        service.punch_out("Peter", at("2025-02-17 10:00:00")).unwrap();

        let outcome = service.finalize("Peter", &six_hour_entry()).unwrap();
        let old = &service.user("Peter").unwrap().pay_periods[0];
        assert!(old.finalized);
        match old.day(d("2025-02-28")) {
            Some(DayLog::FinalDay(f)) => {
                let hours = Decimal::from_f64(f.duration).unwrap().round_dp(2);
                assert_eq!(hours, dec!(6.00));
            }
            other => panic!("expected final-day record, got {:?}", other),
        }
        assert_eq!(outcome.report.total_hours, 8.0);
        assert_eq!(outcome.report.employee, "Peter");
    }

    #[test]
    fn test_finalize_opens_next_period_three_days_later() {
        let (mut service, _dir) = setup_service();
        let outcome = service.finalize("Peter", &six_hour_entry()).unwrap();

        assert_eq!(outcome.next_period.start_date, d("2025-02-28") + Duration::days(3));
        assert_eq!(outcome.next_period.end_date, d("2025-03-14"));
        assert!(!outcome.next_period.finalized);
        assert_eq!(current(&service), outcome.next_period);

        let persisted = reload(&service);
        let periods = &persisted.user("Peter").unwrap().pay_periods;
        assert_eq!(periods.len(), 2);
        assert!(periods[0].finalized);
        assert!(!periods[1].finalized);
    }

    #[test]
    fn test_finalize_single_pair() {
        let (mut service, _dir) = setup_service();
        let entry = FinalDayEntry::new("7:30 AM", "3:45 PM", None, None);
        let outcome = service.finalize("Peter", &entry).unwrap();
        assert_eq!(outcome.report.total_hours, 8.25);
        let last_row = outcome.report.rows.last().unwrap();
        assert_eq!(
            last_row.cells(),
            ["2025-02-28", "7:30 AM", "3:45 PM", "-", "-", "8.25"].map(String::from)
        );
    }

    #[test]
    fn test_finalize_replaces_ordinary_cycles_on_end_date() {
        let (mut service, _dir) = setup_service();
        service.punch_in("Peter", at("2025-02-28 08:00:00")).unwrap();
        service.punch_out("Peter", at("2025-02-28 09:00:00")).unwrap();
        service.finalize("Peter", &six_hour_entry()).unwrap();

        let old = &service.user("Peter").unwrap().pay_periods[0];
        assert_eq!(old.day_state(d("2025-02-28")), DayState::Finalized);
        assert_eq!(period_total(old), 6.0);
    }

    #[test]
    fn test_finalize_out_before_in_is_rejected_without_mutation() {
        let (mut service, dir) = setup_service();
        let before = service.document().clone();
        let file_before = fs::read_to_string(dir.path().join("data.json")).unwrap();

        let entry = FinalDayEntry::new("2:00 PM", "1:00 PM", None, None);
        assert!(matches!(
            service.finalize("Peter", &entry),
            Err(AppError::TimeOrderError(_))
        ));
        let same = FinalDayEntry::new("2:00 PM", "2:00 PM", None, None);
        assert!(matches!(
            service.finalize("Peter", &same),
            Err(AppError::TimeOrderError(_))
        ));
        let second_pair = FinalDayEntry::new("8:00 AM", "12:00 PM", Some("3:00 PM"), Some("1:00 PM"));
        assert!(matches!(
            service.finalize("Peter", &second_pair),
            Err(AppError::TimeOrderError(_))
        ));

        assert_eq!(*service.document(), before);
        assert_eq!(
            fs::read_to_string(dir.path().join("data.json")).unwrap(),
            file_before
        );
    }

    #[test]
    fn test_finalize_field_validation() {
        let (mut service, _dir) = setup_service();
        let missing = FinalDayEntry::new("9:00 AM", "", None, None);
        assert!(matches!(
            service.finalize("Peter", &missing),
            Err(AppError::InputRequired(_))
        ));

        let half_pair = FinalDayEntry::new("9:00 AM", "12:00 PM", Some("1:00 PM"), None);
        assert!(matches!(
            service.finalize("Peter", &half_pair),
            Err(AppError::ValidationError(_))
        ));
        let other_half = FinalDayEntry::new("9:00 AM", "12:00 PM", None, Some("4:00 PM"));
        assert!(matches!(
            service.finalize("Peter", &other_half),
            Err(AppError::ValidationError(_))
        ));

        let garbled = FinalDayEntry::new("9 o'clock", "12:00 PM", None, None);
        assert!(matches!(
            service.finalize("Peter", &garbled),
            Err(AppError::ValidationError(_))
        ));
        assert!(!current(&service).finalized);
    }

    #[test]
    fn test_finalize_report_goes_to_renderer() {
        let (mut service, dir) = setup_service();
        service.punch_in("Peter", at("2025-02-24 08:00:00")).unwrap();
        service.punch_out("Peter", at("2025-02-24 12:00:00")).unwrap();
        let outcome = service.finalize("Peter", &six_hour_entry()).unwrap();

        let renderer = MemoryRenderer::default();
        let target = report_path(dir.path(), "Peter", outcome.report.end_date);
        let written = (&renderer as &dyn ReportRenderer)
            .render(&outcome.report, &target)
            .unwrap();

        assert!(written.ends_with("Peter/Peter Pay Period 2025-02-28.pdf"));
        let rendered = renderer.rendered.borrow();
        assert_eq!(rendered.len(), 1);
        let report = &rendered[0].0;
        assert_eq!(report.workday_rows().count(), 10);
        assert_eq!(report.weekly.len(), 2);
        assert_eq!(report.weekly[1].hours, 10.0);
        assert_eq!(report.total_hours, 10.0);
        assert_eq!(*report, service.report_for("Peter", d("2025-02-28")).unwrap());
    }

    #[test]
    fn test_can_finalize_gates_on_first_pair() {
        assert!(!can_finalize("", ""));
        assert!(!can_finalize("9:00 AM", ""));
        assert!(!can_finalize(" ", "12:00 PM"));
        assert!(can_finalize("9:00 AM", "12:00 PM"));
    }

    #[test]
    fn test_punches_after_finalize_go_to_new_period() {
        let (mut service, _dir) = setup_service();
        service.finalize("Peter", &six_hour_entry()).unwrap();
        service.punch_in("Peter", at("2025-03-03 08:00:00")).unwrap();

        let periods = &service.user("Peter").unwrap().pay_periods;
        assert!(periods[0].day(d("2025-03-03")).is_none());
        assert_eq!(periods[1].day_state(d("2025-03-03")), DayState::Open);
    }

    // --- Custom hours ---

    #[test]
    fn test_custom_hours_override_period_total() {
        let (mut service, _dir) = setup_service();
        service.punch_in("Peter", at("2025-02-17 08:00:00")).unwrap();
        service.punch_out("Peter", at("2025-02-17 16:00:00")).unwrap();
        assert_eq!(period_total(&current(&service)), 8.0);

        service
            .set_custom_hours("Peter", d("2025-02-28"), Some(80.0))
            .unwrap();
        assert_eq!(period_total(&current(&service)), 80.0);
        assert_eq!(service.report_for("Peter", d("2025-02-28")).unwrap().total_hours, 80.0);

        service.set_custom_hours("Peter", d("2025-02-28"), None).unwrap();
        assert_eq!(period_total(&current(&service)), 8.0);
    }

    #[test]
    fn test_custom_hours_validation() {
        let (mut service, _dir) = setup_service();
        assert!(matches!(
            service.set_custom_hours("Peter", d("2025-02-28"), Some(-1.0)),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            service.set_custom_hours("Peter", d("2025-02-28"), Some(f64::NAN)),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            service.set_custom_hours("Peter", d("2025-03-14"), Some(10.0)),
            Err(AppError::PeriodNotFound(_))
        ));
    }

    // --- Persistence failures ---

    #[test]
    fn test_failed_save_leaves_memory_unchanged() {
        let (service, dir) = setup_service();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let mut broken = PunchService::new(
            DataStore::new(blocker.join("data.json")),
            service.document().clone(),
            default_first_period_start(),
        );

        let before = broken.document().clone();
        let err = broken.punch_in("Peter", at("2025-02-17 08:00:00")).unwrap_err();
        assert!(matches!(err, AppError::PersistenceError { .. }));
        assert_eq!(*broken.document(), before);
    }

    #[test]
    fn test_open_with_corrupt_file_starts_empty() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        fs::write(&path, "[1, 2, 3").unwrap();
        let (service, load_error) = PunchService::open(DataStore::new(&path), default_first_period_start());
        assert!(matches!(load_error, Some(AppError::PersistenceError { .. })));
        assert!(service.user_names().is_empty());
    }

    fn corrupt_backups(dir: &Path) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .map_or(false, |n| n.to_string_lossy().starts_with("data.json.corrupt-"))
            })
            .collect();
        found.sort();
        found
    }

    #[test]
    fn test_unreadable_file_survives_next_save() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        // leading zero on the hour is not a stored label
        let original = r#"{"users": {
            "Dana": {"pay_periods": [{"start_date": "2025-02-17", "end_date": "2025-02-28",
                "records": {}, "custom_hours": null, "finalized": false}]},
            "Ida": {"pay_periods": [{"start_date": "2025-02-17", "end_date": "2025-02-28",
                "records": {"2025-02-17": [{"punch_in": "09:00 AM"}]},
                "custom_hours": null, "finalized": false}]}
        }}"#;
        fs::write(&path, original).unwrap();

        let (mut service, load_error) = PunchService::open(DataStore::new(&path), default_first_period_start());
        assert!(matches!(load_error, Some(AppError::PersistenceError { .. })));
        service.login("Peter").unwrap();

        let backups = corrupt_backups(dir.path());
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), original);
        assert_eq!(reload(&service).user_names().collect::<Vec<_>>(), vec!["Peter"]);

        // only the first save copies the file aside
        service.login("Zed").unwrap();
        assert_eq!(corrupt_backups(dir.path()).len(), 1);
    }

    #[test]
    fn test_readable_file_is_never_copied_aside() {
        let (mut service, dir) = setup_service();
        service.punch_in("Peter", at("2025-02-17 08:00:00")).unwrap();
        assert!(corrupt_backups(dir.path()).is_empty());
    }

    #[test]
    fn test_login_rejects_path_like_names() {
        let (mut service, _dir) = setup_service();
        for name in ["/tmp/x", "../..", "..", ".", "a\\b"] {
            assert!(
                matches!(service.login(name), Err(AppError::ValidationError(_))),
                "{} should be rejected",
                name
            );
        }
        assert_eq!(service.user_names(), vec!["Peter".to_string()]);
        service.login("Ana-Maria O'Neil").unwrap();
    }
}
