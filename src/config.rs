// src/config.rs
//
// Static schedule configuration: operating period, per-date slot defaults,
// the legacy global slot table, week definitions and the staff roster.
// The built-in seed mirrors the January 2026 pre-open schedule; a JSON
// file with the same shape can replace it at startup.

use crate::slots::ShiftSlot;
use crate::weeks::Week;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

pub const DEFAULT_REQUIRED_STAFF: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Leader,
    Staff,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperatingDate {
    pub date: String,
    /// 0 = Sunday .. 6 = Saturday.
    pub weekday: u8,
    #[serde(default)]
    pub has_morning: bool,
    #[serde(default)]
    pub has_afternoon: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationPeriod {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PunchTolerance {
    /// Minutes before slot start from which a punch is accepted.
    pub early_minutes: u32,
    /// Minutes after slot start from which a clock-in counts as late.
    pub late_minutes: u32,
}

impl Default for PunchTolerance {
    fn default() -> Self {
        Self {
            early_minutes: 10,
            late_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub cafe_name: String,
    pub operation_period: OperationPeriod,
    pub operation_dates: Vec<OperatingDate>,
    /// Legacy global slot table, referenced by `date_slot_ids`.
    pub global_slots: BTreeMap<String, ShiftSlot>,
    /// Legacy per-date slot-ID lists (oldest fallback tier).
    pub date_slot_ids: BTreeMap<String, Vec<String>>,
    /// Per-date slot defaults (middle tier).
    pub date_shift_slots: BTreeMap<String, Vec<ShiftSlot>>,
    pub weeks: Vec<Week>,
    pub weekly_shift_limit: u32,
    pub required_staff_per_slot: u32,
    #[serde(default)]
    pub punch_tolerance: PunchTolerance,
    pub staff: Vec<Staff>,
}

impl ScheduleConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: ScheduleConfig = serde_json::from_str(&raw)?;
        info!(
            "loaded schedule config from {} ({} operating dates, {} staff)",
            path.display(),
            config.operation_dates.len(),
            config.staff.len()
        );
        Ok(config)
    }

    pub fn staff_by_id(&self, staff_id: &str) -> Option<&Staff> {
        self.staff.iter().find(|s| s.id == staff_id)
    }

    pub fn staff_by_name(&self, name: &str) -> Option<&Staff> {
        self.staff.iter().find(|s| s.name == name)
    }

    pub fn staff_name(&self, staff_id: &str) -> String {
        self.staff_by_id(staff_id)
            .map(|s| s.name.clone())
            .unwrap_or_default()
    }

    /// The January 2026 pre-open schedule.
    pub fn builtin() -> Self {
        fn slot(id: &str, label: &str, start: &str, end: &str, required: u32) -> ShiftSlot {
            ShiftSlot {
                id: id.to_string(),
                label: label.to_string(),
                start: start.to_string(),
                end: end.to_string(),
                required_staff: Some(required),
            }
        }
        fn op(date: &str, weekday: u8, morning: bool, afternoon: bool) -> OperatingDate {
            OperatingDate {
                date: date.to_string(),
                weekday,
                has_morning: morning,
                has_afternoon: afternoon,
            }
        }

        let mut global_slots = BTreeMap::new();
        global_slots.insert(
            "SLOT_1".to_string(),
            slot("SLOT_1", "枠1", "14:40", "16:10", 3),
        );
        global_slots.insert(
            "SLOT_2".to_string(),
            slot("SLOT_2", "枠2", "16:10", "17:40", 3),
        );

        let afternoon = |d: &str| {
            (
                d.to_string(),
                vec![
                    slot("SLOT_1", "枠1", "14:40", "16:10", 3),
                    slot("SLOT_2", "枠2", "16:10", "17:40", 3),
                ],
            )
        };
        let morning = |d: &str| {
            (
                d.to_string(),
                vec![
                    slot("SLOT_1", "枠1", "10:40", "12:10", 3),
                    slot("SLOT_2", "枠2", "12:10", "13:40", 3),
                ],
            )
        };
        let date_shift_slots: BTreeMap<_, _> = [
            afternoon("2026-01-21"),
            afternoon("2026-01-22"),
            morning("2026-01-23"),
            afternoon("2026-01-26"),
            morning("2026-01-27"),
        ]
        .into_iter()
        .collect();

        let date_slot_ids: BTreeMap<_, _> = [
            "2026-01-21",
            "2026-01-22",
            "2026-01-23",
            "2026-01-26",
            "2026-01-27",
        ]
        .into_iter()
        .map(|d| {
            (
                d.to_string(),
                vec!["SLOT_1".to_string(), "SLOT_2".to_string()],
            )
        })
        .collect();

        let weeks = vec![
            Week {
                week_key: "2026-01-19".to_string(),
                label: "1/19週".to_string(),
                description: Some("1月第3週".to_string()),
                dates: vec![
                    "2026-01-21".to_string(),
                    "2026-01-22".to_string(),
                    "2026-01-23".to_string(),
                ],
            },
            Week {
                week_key: "2026-01-26".to_string(),
                label: "1/26週".to_string(),
                description: Some("1月第4週".to_string()),
                dates: vec!["2026-01-26".to_string(), "2026-01-27".to_string()],
            },
        ];

        let roster: [(&str, &str, Role); 32] = [
            ("25011003", "小畑 璃海", Role::Staff),
            ("25011008", "志鎌 智果", Role::Staff),
            ("25011018", "薄井 菜々歩", Role::Staff),
            ("25011034", "小野寺 陸斗", Role::Staff),
            ("25011039", "和根崎 悠平", Role::Staff),
            ("25011045", "石井 陽大", Role::Staff),
            ("25011152", "鶴巻 結衣", Role::Staff),
            ("25011174", "武山 海瑠", Role::Staff),
            ("25011192", "福田 蒼馬", Role::Staff),
            ("25011229", "山本 凛人", Role::Staff),
            ("25011253", "川村 悠紅", Role::Staff),
            ("25011315", "鈴木 初美", Role::Staff),
            ("25011335", "石原 礼野", Role::Staff),
            ("25011370", "鈴木 心美", Role::Staff),
            ("25011422", "山田 暁", Role::Staff),
            ("25011444", "河鰭 寧々", Role::Staff),
            ("25011466", "鈴木 大翔", Role::Staff),
            ("25011472", "伊藤 凛香", Role::Staff),
            ("25011490", "鈴木 らら", Role::Staff),
            ("25011571", "鈴木 悠敏", Role::Staff),
            ("25011584", "柴田 悠登", Role::Staff),
            ("25011605", "高山 琉音", Role::Staff),
            ("25011614", "高橋 奏", Role::Staff),
            ("25011621", "門間 琉央", Role::Staff),
            ("25011627", "加藤 大青", Role::Staff),
            ("25011690", "木村 苺香", Role::Staff),
            ("25011698", "佐々 眞陽", Role::Staff),
            ("25011754", "山﨑 琢己", Role::Admin),
            ("25011845", "延谷 碧", Role::Staff),
            ("25011920", "佐藤 斗和", Role::Staff),
            ("25011958", "渡邉 瑛介", Role::Staff),
            ("25011985", "中村 星翔", Role::Staff),
        ];
        let staff = roster
            .into_iter()
            .map(|(id, name, role)| Staff {
                id: id.to_string(),
                name: name.to_string(),
                role,
            })
            .collect();

        Self {
            cafe_name: "共創カフェ".to_string(),
            operation_period: OperationPeriod {
                start: "2026-01-21".to_string(),
                end: "2026-01-27".to_string(),
            },
            operation_dates: vec![
                op("2026-01-21", 3, false, true),
                op("2026-01-22", 4, false, true),
                op("2026-01-23", 5, true, false),
                op("2026-01-26", 1, false, true),
                op("2026-01-27", 2, true, false),
            ],
            global_slots,
            date_slot_ids,
            date_shift_slots,
            weeks,
            weekly_shift_limit: 1,
            required_staff_per_slot: DEFAULT_REQUIRED_STAFF,
            punch_tolerance: PunchTolerance::default(),
            staff,
        }
    }
}
