// src/schedule_tests.rs

#[cfg(test)]
mod tests {
    use crate::attendance::{ClockRecord, ClockStatus, ClockType};
    use crate::calendar;
    use crate::config::ScheduleConfig;
    use crate::import::SlotImportRow;
    use crate::reports;
    use crate::shifts::{ShiftService, ShiftSubmission, SubmitError};
    use crate::slots::{ShiftSlot, SlotConfigService, SlotOverrides};
    use crate::store::{keys, temp_store, LocalStore};
    use crate::sync::{ApiClient, ApiError, Upstream};
    use crate::weeks;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn slot(id: &str, label: &str, start: &str, end: &str, required: Option<u32>) -> ShiftSlot {
        ShiftSlot {
            id: id.to_string(),
            label: label.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            required_staff: required,
        }
    }

    fn submission(id: &str, staff_id: &str, name: &str, date: &str, slot_id: &str) -> ShiftSubmission {
        ShiftSubmission {
            id: id.to_string(),
            date: date.to_string(),
            staff_id: staff_id.to_string(),
            staff_name: name.to_string(),
            slot_id: slot_id.to_string(),
            week_key: String::new(),
        }
    }

    fn setup() -> (Arc<ScheduleConfig>, Arc<LocalStore>, Arc<SlotConfigService>) {
        setup_with(ScheduleConfig::builtin())
    }

    fn setup_with(
        config: ScheduleConfig,
    ) -> (Arc<ScheduleConfig>, Arc<LocalStore>, Arc<SlotConfigService>) {
        let config = Arc::new(config);
        let store = Arc::new(temp_store("schedule"));
        let upstream: Arc<dyn Upstream> = Arc::new(ApiClient::unconfigured());
        let service = Arc::new(SlotConfigService::new(
            config.clone(),
            store.clone(),
            upstream,
        ));
        (config, store, service)
    }

    fn set_overrides(store: &LocalStore, overrides: &SlotOverrides) {
        store.set(keys::CUSTOM_SHIFT_SLOTS, overrides).unwrap();
    }

    // --- Resolution priority ---

    #[test]
    fn empty_custom_override_suppresses_every_lower_tier() {
        let (config, store, service) = setup();
        let mut overrides = SlotOverrides::new();
        overrides.insert("2026-01-21".to_string(), Vec::new());
        set_overrides(&store, &overrides);

        // Defaults define two slots for the date, but the tombstone wins.
        assert!(service.resolve_slots("2026-01-21").is_empty());
        assert!(!calendar::is_operating_date(&config, &overrides, "2026-01-21"));
        assert!(!calendar::operating_dates(&config, &overrides)
            .contains(&"2026-01-21".to_string()));
    }

    #[test]
    fn defaults_resolve_in_insertion_order() {
        let (_, _, service) = setup();
        let slots = service.resolve_slots("2026-01-22");
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].id, "SLOT_1");
        assert_eq!(slots[0].start, "14:40");
        assert_eq!(slots[1].id, "SLOT_2");
    }

    #[test]
    fn custom_override_replaces_defaults_verbatim() {
        let (_, store, service) = setup();
        let mut overrides = SlotOverrides::new();
        // Deliberately not time-sorted; order must survive resolution.
        overrides.insert(
            "2026-01-21".to_string(),
            vec![
                slot("SLOT_B", "夕枠", "16:00", "18:00", Some(2)),
                slot("SLOT_A", "朝枠", "10:00", "12:00", Some(2)),
            ],
        );
        set_overrides(&store, &overrides);

        let slots = service.resolve_slots("2026-01-21");
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].id, "SLOT_B");
        assert_eq!(slots[1].id, "SLOT_A");
    }

    #[test]
    fn legacy_slot_ids_are_the_last_fallback() {
        let mut config = ScheduleConfig::builtin();
        config.date_shift_slots.remove("2026-01-21");
        config.date_slot_ids.insert(
            "2026-01-21".to_string(),
            vec!["SLOT_1".to_string(), "SLOT_9".to_string()],
        );
        let (_, _, service) = setup_with(config);

        // SLOT_9 does not exist in the global table and is dropped silently.
        let slots = service.resolve_slots("2026-01-21");
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].id, "SLOT_1");
        assert_eq!(slots[0].start, "14:40");
    }

    #[test]
    fn unknown_date_resolves_to_empty() {
        let (_, _, service) = setup();
        assert!(service.resolve_slots("2027-06-01").is_empty());
    }

    #[test]
    fn required_staff_falls_through_instance_global_default() {
        let mut config = ScheduleConfig::builtin();
        config.required_staff_per_slot = 4;
        let (_, store, service) = setup_with(config);

        let mut overrides = SlotOverrides::new();
        overrides.insert(
            "2026-02-02".to_string(),
            vec![
                slot("SLOT_X", "A", "10:00", "12:00", Some(5)),
                slot("SLOT_1", "B", "12:00", "14:00", None),
                slot("SLOT_Y", "C", "14:00", "16:00", None),
            ],
        );
        set_overrides(&store, &overrides);

        // Instance field wins.
        assert_eq!(service.resolve_required_staff("SLOT_X", "2026-02-02"), 5);
        // No instance value, but the legacy global SLOT_1 carries 3.
        assert_eq!(service.resolve_required_staff("SLOT_1", "2026-02-02"), 3);
        // Nothing anywhere: the configured default.
        assert_eq!(service.resolve_required_staff("SLOT_Y", "2026-02-02"), 4);
    }

    // --- Operation calendar ---

    #[test]
    fn custom_dates_join_the_calendar_and_widen_the_period() {
        let (config, store, _) = setup();
        let mut overrides = SlotOverrides::new();
        overrides.insert(
            "2026-02-02".to_string(),
            vec![slot("S", "枠", "10:00", "12:00", Some(3))],
        );
        overrides.insert(
            "2026-01-10".to_string(),
            vec![slot("S", "枠", "10:00", "12:00", Some(3))],
        );
        // A removed date far out must affect neither list nor period.
        overrides.insert("2026-03-01".to_string(), Vec::new());
        set_overrides(&store, &overrides);

        let dates = calendar::operating_dates(&config, &overrides);
        assert!(dates.contains(&"2026-02-02".to_string()));
        assert!(dates.contains(&"2026-01-10".to_string()));
        assert!(!dates.contains(&"2026-03-01".to_string()));
        let sorted: Vec<_> = {
            let mut copy = dates.clone();
            copy.sort();
            copy
        };
        assert_eq!(dates, sorted);

        let period = calendar::operating_period(&config, &overrides);
        assert_eq!(period.start, "2026-01-10");
        assert_eq!(period.end, "2026-02-02");
    }

    #[test]
    fn static_period_holds_without_overrides() {
        let (config, _, _) = setup();
        let period = calendar::operating_period(&config, &SlotOverrides::new());
        assert_eq!(period.start, "2026-01-21");
        assert_eq!(period.end, "2026-01-27");
    }

    #[test]
    fn operation_date_is_synthesized_for_custom_days() {
        let (config, _, _) = setup();
        let mut overrides = SlotOverrides::new();
        overrides.insert(
            "2026-02-03".to_string(),
            vec![slot("S", "枠", "10:00", "12:00", Some(3))],
        );

        let day = calendar::operation_date(&config, &overrides, "2026-02-03").unwrap();
        assert_eq!(day.weekday, 2); // a Tuesday
        assert!(calendar::operation_date(&config, &overrides, "2026-02-04").is_none());
    }

    // --- Weeks ---

    #[test]
    fn week_key_prefers_the_configured_week() {
        let (config, _, _) = setup();
        let overrides = SlotOverrides::new();
        assert_eq!(
            weeks::week_key_for(&config, &overrides, "2026-01-22").as_deref(),
            Some("2026-01-19")
        );
    }

    #[test]
    fn week_key_is_synthesized_from_the_monday() {
        let (config, _, _) = setup();
        let overrides = SlotOverrides::new();
        // Thursday of an unconfigured week.
        assert_eq!(
            weeks::week_key_for(&config, &overrides, "2026-02-05").as_deref(),
            Some("2026-02-02")
        );
        // Sunday belongs to the week that started the previous Monday.
        assert_eq!(
            weeks::week_key_for(&config, &overrides, "2026-02-08").as_deref(),
            Some("2026-02-02")
        );
        assert!(weeks::week_key_for(&config, &overrides, "garbage").is_none());
    }

    #[test]
    fn custom_dates_synthesize_weeks_idempotently() {
        let (config, _, _) = setup();
        let mut overrides = SlotOverrides::new();
        overrides.insert(
            "2026-02-04".to_string(),
            vec![slot("S", "枠", "10:00", "12:00", Some(3))],
        );
        overrides.insert(
            "2026-02-03".to_string(),
            vec![slot("S", "枠", "10:00", "12:00", Some(3))],
        );
        overrides.insert("2026-02-06".to_string(), Vec::new());

        let first = weeks::weeks(&config, &overrides);
        let second = weeks::weeks(&config, &overrides);
        assert_eq!(first, second);

        let synthesized = first
            .iter()
            .find(|w| w.week_key == "2026-02-02")
            .expect("week was synthesized");
        assert_eq!(synthesized.label, "2/2週");
        // Dates inserted sorted; the tombstoned date stays out.
        assert_eq!(synthesized.dates, vec!["2026-02-03", "2026-02-04"]);

        let mut keys: Vec<_> = first.iter().map(|w| w.week_key.clone()).collect();
        keys.dedup();
        assert_eq!(keys.len(), first.len(), "no duplicate weeks");
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted, "weeks sorted by key");
    }

    #[test]
    fn week_info_finds_static_and_synthesized_weeks() {
        let (config, _, _) = setup();
        let overrides = SlotOverrides::new();
        let week = weeks::week_info(&config, &overrides, "2026-01-19").unwrap();
        assert_eq!(week.label, "1/19週");
        assert!(weeks::week_info(&config, &overrides, "2026-06-01").is_none());
    }

    #[test]
    fn two_submissions_in_one_week_are_one_violation() {
        let (config, _, _) = setup();
        let overrides = SlotOverrides::new();
        let submissions = vec![
            submission("1", "A", "Staff A", "2026-01-21", "SLOT_1"),
            submission("2", "A", "Staff A", "2026-01-22", "SLOT_1"),
            submission("3", "B", "Staff B", "2026-01-21", "SLOT_2"),
        ];

        let violations = weeks::detect_violations(&config, &overrides, &submissions);
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.week_key, "2026-01-19");
        assert_eq!(v.staff_id, "A");
        assert_eq!(v.count, 2);
        assert_eq!(v.submissions.len(), 2);
    }

    #[test]
    fn one_submission_per_week_is_clean() {
        let (config, _, _) = setup();
        let overrides = SlotOverrides::new();
        let submissions = vec![
            submission("1", "A", "Staff A", "2026-01-21", "SLOT_1"),
            submission("2", "A", "Staff A", "2026-01-26", "SLOT_1"),
        ];
        assert!(weeks::detect_violations(&config, &overrides, &submissions).is_empty());
    }

    #[test]
    fn denormalized_week_keys_are_trusted() {
        let (config, _, _) = setup();
        let overrides = SlotOverrides::new();
        let mut a = submission("1", "A", "Staff A", "2026-01-21", "SLOT_1");
        a.week_key = "2026-01-19".to_string();
        let b = submission("2", "A", "Staff A", "2026-01-22", "SLOT_1");

        let violations = weeks::detect_violations(&config, &overrides, &[a, b]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].count, 2);
    }

    // --- Slot mutations ---

    #[tokio::test]
    async fn saving_a_slot_starts_from_the_defaults() {
        let (_, _, service) = setup();
        let saved = service
            .save_slot(
                "2026-01-21",
                slot("", "", "18:00", "19:30", Some(2)),
            )
            .await
            .unwrap();
        assert!(saved.id.starts_with("SLOT_"));
        assert_eq!(saved.label, "枠3");

        let slots = service.resolve_slots("2026-01-21");
        assert_eq!(slots.len(), 3, "defaults were copied before appending");
        assert_eq!(slots[0].id, "SLOT_1");
        assert_eq!(slots[2].start, "18:00");
    }

    #[tokio::test]
    async fn saving_an_existing_slot_updates_in_place() {
        let (_, _, service) = setup();
        service
            .save_slot("2026-01-21", slot("SLOT_1", "枠1", "15:00", "16:30", Some(4)))
            .await
            .unwrap();

        let slots = service.resolve_slots("2026-01-21");
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start, "15:00");
        assert_eq!(service.resolve_required_staff("SLOT_1", "2026-01-21"), 4);
    }

    #[tokio::test]
    async fn deleting_the_last_slot_leaves_a_tombstone() {
        let (config, _, service) = setup();
        service.delete_slot("2026-01-21", Some("SLOT_1")).await.unwrap();
        assert_eq!(service.resolve_slots("2026-01-21").len(), 1);

        service.delete_slot("2026-01-21", Some("SLOT_2")).await.unwrap();
        assert!(service.resolve_slots("2026-01-21").is_empty());
        let overrides = service.custom_overrides();
        assert!(!calendar::is_operating_date(&config, &overrides, "2026-01-21"));
    }

    #[tokio::test]
    async fn deleting_without_an_id_removes_the_whole_day() {
        let (_, _, service) = setup();
        service.delete_slot("2026-01-22", None).await.unwrap();
        assert!(service.resolve_slots("2026-01-22").is_empty());
    }

    #[tokio::test]
    async fn import_appends_rows_with_fresh_ids() {
        let (config, _, service) = setup();
        let rows = vec![
            SlotImportRow {
                date: "2026-02-02".to_string(),
                label: "午前枠".to_string(),
                start: "10:00".to_string(),
                end: "12:00".to_string(),
                required_staff: 2,
            },
            SlotImportRow {
                date: "2026-02-02".to_string(),
                label: "午後枠".to_string(),
                start: "13:00".to_string(),
                end: "15:00".to_string(),
                required_staff: 3,
            },
        ];
        assert_eq!(service.import_slots(&rows).await.unwrap(), 2);

        let slots = service.resolve_slots("2026-02-02");
        assert_eq!(slots.len(), 2);
        assert_ne!(slots[0].id, slots[1].id);
        let overrides = service.custom_overrides();
        assert!(calendar::is_operating_date(&config, &overrides, "2026-02-02"));
        assert!(weeks::weeks(&config, &overrides)
            .iter()
            .any(|w| w.week_key == "2026-02-02"));
    }

    // --- Refresh collapsing ---

    struct StubUpstream {
        calls: AtomicUsize,
        slots: SlotOverrides,
    }

    #[async_trait]
    impl Upstream for StubUpstream {
        fn is_configured(&self) -> bool {
            true
        }
        async fn get_all_shifts(&self) -> Result<Vec<ShiftSubmission>, ApiError> {
            Err(ApiError::NotConfigured)
        }
        async fn get_records(
            &self,
            _date: Option<&str>,
        ) -> Result<Vec<crate::attendance::RawClockRecord>, ApiError> {
            Ok(Vec::new())
        }
        async fn punch(&self, _record: &ClockRecord) -> Result<(), ApiError> {
            Ok(())
        }
        async fn delete_shift(&self, _shift_id: &str) -> Result<(), ApiError> {
            Ok(())
        }
        async fn save_shift_slot(
            &self,
            _date: &str,
            slot: &ShiftSlot,
        ) -> Result<ShiftSlot, ApiError> {
            Ok(slot.clone())
        }
        async fn delete_shift_slot_config(
            &self,
            _date: &str,
            _slot_id: Option<&str>,
        ) -> Result<(), ApiError> {
            Ok(())
        }
        async fn import_shift_slots(&self, rows: &[SlotImportRow]) -> Result<usize, ApiError> {
            Ok(rows.len())
        }
        async fn get_shift_slot_config(&self) -> Result<SlotOverrides, ApiError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.slots.clone())
        }
    }

    #[tokio::test]
    async fn concurrent_refreshes_collapse_to_one_fetch() {
        let mut slots = SlotOverrides::new();
        slots.insert(
            "2026-02-02".to_string(),
            vec![slot("S", "枠", "10:00", "12:00", Some(3))],
        );
        let upstream = Arc::new(StubUpstream {
            calls: AtomicUsize::new(0),
            slots: slots.clone(),
        });
        let service = SlotConfigService::new(
            Arc::new(ScheduleConfig::builtin()),
            Arc::new(temp_store("refresh")),
            upstream.clone(),
        );

        let (a, b) = tokio::join!(service.refresh(true), service.refresh(true));
        assert_eq!(a, slots);
        assert_eq!(b, slots);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);

        // Cache satisfies non-forced reads without another fetch.
        let c = service.refresh(false).await;
        assert_eq!(c, slots);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);

        // Invalidation and a forced call go back upstream.
        service.invalidate();
        let d = service.refresh(true).await;
        assert_eq!(d, slots);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn upstream_shift_fetch_failure_falls_back_to_snapshot() {
        let config = Arc::new(ScheduleConfig::builtin());
        let store = Arc::new(temp_store("shift-fallback"));
        let upstream = Arc::new(StubUpstream {
            calls: AtomicUsize::new(0),
            slots: SlotOverrides::new(),
        });
        let slot_config = Arc::new(SlotConfigService::new(
            config.clone(),
            store.clone(),
            upstream.clone(),
        ));
        let shifts = ShiftService::new(config, store.clone(), upstream, slot_config);

        let local = vec![submission("1", "25011003", "小畑 璃海", "2026-01-21", "SLOT_1")];
        store.set(keys::SHIFTS, &local).unwrap();

        // get_all_shifts errors; the local snapshot must be the answer.
        assert_eq!(shifts.load_all().await, local);
    }

    // --- Submissions ---

    fn shift_service() -> (Arc<ScheduleConfig>, ShiftService) {
        let config = Arc::new(ScheduleConfig::builtin());
        let store = Arc::new(temp_store("shifts"));
        let upstream: Arc<dyn Upstream> = Arc::new(ApiClient::unconfigured());
        let slot_config = Arc::new(SlotConfigService::new(
            config.clone(),
            store.clone(),
            upstream.clone(),
        ));
        let service = ShiftService::new(config.clone(), store, upstream, slot_config);
        (config, service)
    }

    #[test]
    fn submit_denormalizes_the_week_key() {
        let (_, service) = shift_service();
        let shift = service.submit("25011003", "2026-01-21", "SLOT_1").unwrap();
        assert_eq!(shift.week_key, "2026-01-19");
        assert_eq!(shift.staff_name, "小畑 璃海");
        assert_eq!(service.weekly_count_for("25011003", "2026-01-19"), 1);
        assert_eq!(service.by_date("2026-01-21").len(), 1);
        assert_eq!(service.for_staff("25011003").len(), 1);
    }

    #[test]
    fn submit_rejects_bad_input_without_writing() {
        let (_, service) = shift_service();
        assert!(matches!(
            service.submit("99999999", "2026-01-21", "SLOT_1"),
            Err(SubmitError::UnknownStaff(_))
        ));
        assert!(matches!(
            service.submit("25011003", "2026-01-24", "SLOT_1"),
            Err(SubmitError::NotOperating(_))
        ));
        assert!(matches!(
            service.submit("25011003", "2026-01-21", "SLOT_9"),
            Err(SubmitError::SlotUnavailable { .. })
        ));
        assert!(service.all().is_empty());
    }

    #[test]
    fn second_submission_in_a_week_is_allowed_but_visible() {
        let (config, service) = shift_service();
        service.submit("25011003", "2026-01-21", "SLOT_1").unwrap();
        service.submit("25011003", "2026-01-22", "SLOT_1").unwrap();

        assert_eq!(service.weekly_count_for("25011003", "2026-01-19"), 2);
        let violations =
            weeks::detect_violations(&config, &SlotOverrides::new(), &service.all());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].staff_id, "25011003");
    }

    #[tokio::test]
    async fn cancel_removes_by_id() {
        let (_, service) = shift_service();
        let shift = service.submit("25011003", "2026-01-21", "SLOT_1").unwrap();
        assert!(service.cancel(&shift.id).await.unwrap());
        assert!(service.all().is_empty());
        assert!(!service.cancel("missing").await.unwrap());
    }

    // --- Aggregation ---

    #[test]
    fn day_fill_caps_overfilled_slots() {
        let (_, _, service) = setup();
        let date = "2026-01-21";
        let slots = service.resolve_slots(date);
        let submissions: Vec<ShiftSubmission> = (0..4)
            .map(|i| {
                submission(
                    &format!("s{}", i),
                    &format!("staff{}", i),
                    "x",
                    date,
                    "SLOT_1",
                )
            })
            .collect();

        let fill = reports::day_fill(date, &slots, &submissions, &service);
        assert_eq!(fill.total_required, 6);
        assert_eq!(fill.slots[0].filled, 4);
        // Four requests against a headcount of three count as three.
        assert_eq!(fill.total_filled, 3);
    }

    #[test]
    fn schedule_stats_counts_filled_and_short_slots() {
        let (_, _, service) = setup();
        let submissions: Vec<ShiftSubmission> = (0..3)
            .map(|i| {
                submission(
                    &format!("s{}", i),
                    &format!("staff{}", i),
                    "x",
                    "2026-01-21",
                    "SLOT_1",
                )
            })
            .collect();

        let stats = reports::schedule_stats(&service, &submissions);
        assert_eq!(stats.total_slots, 10);
        assert_eq!(stats.filled_slots, 1);
        assert_eq!(stats.shortage_slots, 9);
    }

    #[test]
    fn week_overview_counts_distinct_members() {
        let (_, _, service) = setup();
        let submissions = vec![
            submission("1", "A", "Staff A", "2026-01-21", "SLOT_1"),
            submission("2", "A", "Staff A", "2026-01-22", "SLOT_1"),
            submission("3", "B", "Staff B", "2026-01-22", "SLOT_2"),
        ];
        let overview = reports::week_overview(&service, &submissions);
        let first = overview
            .iter()
            .find(|w| w.week_key == "2026-01-19")
            .unwrap();
        assert_eq!(first.member_count, 2);
        assert_eq!(
            first.date_counts,
            vec![
                ("2026-01-21".to_string(), 1),
                ("2026-01-22".to_string(), 2),
                ("2026-01-23".to_string(), 0),
            ]
        );
    }

    #[test]
    fn shift_table_csv_fills_empty_slots_with_placeholders() {
        let (_, _, service) = setup();
        let mut sub = submission("1", "25011003", "小畑 璃海", "2026-01-21", "SLOT_1");
        sub.week_key = "2026-01-19".to_string();

        let csv = reports::shift_table_csv(&service, &[sub]).unwrap();
        assert!(csv.starts_with("日付,枠,開始時刻,終了時刻,学生番号,スタッフ名,週"));
        assert!(csv.contains("2026-01-21,枠1,14:40,16:10,25011003,小畑 璃海,1/19週"));
        assert!(csv.contains("（未定）"));
    }

    #[test]
    fn staff_stats_match_by_id_or_name() {
        let (config, _, _) = setup();
        let submissions = vec![submission(
            "1",
            "25011003",
            "小畑 璃海",
            "2026-01-21",
            "SLOT_1",
        )];
        let records = vec![
            ClockRecord {
                id: "r1".to_string(),
                date: "2026-01-21".to_string(),
                staff_id: "25011003".to_string(),
                staff_name: "小畑 璃海".to_string(),
                slot_id: "SLOT_1".to_string(),
                slot_label: "枠1".to_string(),
                clock_type: ClockType::In,
                time: "14:40".to_string(),
                status: ClockStatus::Normal,
                timestamp: "2026-01-21T05:40:00+09:00".to_string(),
            },
            // Legacy record: name only, still counts for the same person.
            ClockRecord {
                id: "r2".to_string(),
                date: "2026-01-22".to_string(),
                staff_id: String::new(),
                staff_name: "小畑 璃海".to_string(),
                slot_id: "SLOT_1".to_string(),
                slot_label: "枠1".to_string(),
                clock_type: ClockType::In,
                time: "14:40".to_string(),
                status: ClockStatus::Normal,
                timestamp: "2026-01-22T05:40:00+09:00".to_string(),
            },
        ];

        let stats = reports::staff_stats(&config, &submissions, &records);
        let row = stats.iter().find(|s| s.staff_id == "25011003").unwrap();
        assert_eq!(row.shift_count, 1);
        assert_eq!(row.attendance_count, 2);
        let other = stats.iter().find(|s| s.staff_id == "25011008").unwrap();
        assert_eq!(other.attendance_count, 0);
    }
}
