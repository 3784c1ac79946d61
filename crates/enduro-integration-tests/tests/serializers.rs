//! Integration test: route sheets moving between the plain-text form, both
//! structured record versions and full printouts.

use enduro_core::action::{Action, ActionType};
use enduro_core::enduro::Enduro;
use enduro_core::record::{self, EnduroRecord, FORMAT_VERSION};
use enduro_core::test_utils::{self, PINE_HILL_RS, PINE_HILL_V1_JSON, PINE_HILL_V2_JSON};
use enduro_core::text;
use enduro_core::units::Distance;
use enduro_core::validation::compare_timing;

const JACKHAMMER_2015_RS: &str = "# Enduro Route Sheet
     title Jackhammer
    title2 October 18,2015
    title3 Be Smart
     speed   0.00  12
     speed   0.40  18
     speed   4.60  22
     speed   9.00  24
      note  10.90 Check Out
     reset  11.40  15.40
     speed  15.40  20
     speed  23.40  21
      note  26.80 Check in
     speed  26.90  30
     speed  29.90  24
      note  33.20 Check Out
     reset  33.90  37.90
     speed  33.90  20
     speed  38.90  24
      note  40.60 Check Out
     speed  40.90  20
     reset  41.90  43.90
     speed  43.90  18
     speed  47.20  25
     speed  52.20  12
      note  52.30 Check (going to try and make you early)
     speed  52.60  24
     reset  52.60  56.60
     speed  57.00  18
      note  57.20 Going to try and make you early again only .5 mile between checks
     reset  59.10  68.10
      note  59.20 Gas
     speed  71.10  27
     speed  73.80  24
      note  74.70 Check Out
     reset  75.40  78.20
     speed  78.20  20
      note  84.10 Slowing us down to get on the road
     speed  84.20   6
     speed  84.30  12
     speed  86.90  18
     speed  89.30  24
     speed  91.70  36
     speed  94.10  24
      note  94.20 Check Out
     reset  94.90  96.90
     speed  97.30  18
     speed  99.40  22
     reset 104.90 107.10
     speed 107.10  18
     speed 108.90  23
     speed 111.20  30
     speed 117.20  36
      note 120.30 Check Out
     speed 120.80  12
     reset 121.00 123.40
      note 123.70 Easy ride to gas
     reset 126.20 129.80
      note 126.30 Gas
      note 129.90 Wach for check just out of GAS .2Mi
     speed 130.00  22
 free_time 132.20   5
     speed 133.30  60
      note 145.20 Check Out
     speed 145.30  12
     speed 145.50  60
     reset 145.50 165.50
     speed 165.50  24
      note 169.80 Check Out (may try to suck you in early due to speed change)
     speed 169.90  12
     speed 171.10  25
      note 173.70 Check Out (may try to suck you in ealry due to speed change)
     speed 176.10  12
 free_time 176.30  10
      note 176.40 Easy ride home
       end 178.70
";

fn actions(enduro: &Enduro) -> Vec<Action> {
    enduro.route_sheet().actions().cloned().collect()
}

fn count(enduro: &Enduro, action_type: ActionType) -> usize {
    enduro
        .route_sheet()
        .actions()
        .filter(|a| a.action_type() == action_type)
        .count()
}

/// Action lines with whitespace collapsed, sorted.
fn normalized_action_lines(rs: &str) -> Vec<String> {
    let mut lines: Vec<String> = rs
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with('#')
                && !line.starts_with("title")
                && !line.starts_with("keytime")
        })
        .collect();
    lines.sort();
    lines
}

// ===========================================================================
// Plain text <-> structured records
// ===========================================================================

#[test]
fn pine_hill_reads_the_same_in_every_form() {
    let from_text = text::parse(PINE_HILL_RS);
    let from_v1 = record::from_json(PINE_HILL_V1_JSON).unwrap();
    let from_v2 = record::from_json(PINE_HILL_V2_JSON).unwrap();

    assert_eq!(from_text.route_sheet().key_time(), 9 * 3600);
    assert_eq!(from_v1.route_sheet().key_time(), 9 * 3600);
    assert_eq!(actions(&from_text).len(), 26);
    assert_eq!(actions(&from_text), actions(&from_v1));
    assert_eq!(actions(&from_v1), actions(&from_v2));
}

#[test]
fn upgraded_record_writes_current_version() {
    let enduro = record::from_json(PINE_HILL_V1_JSON).unwrap();
    let json = record::to_json(&enduro).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["version"], FORMAT_VERSION.to_string());
    assert_eq!(value["routeSheet"]["keyTime"], 32400);
    assert_eq!(value["routeSheet"]["actions"][5]["type"], "reset");

    let back = EnduroRecord::from_json_str(&json).unwrap().to_enduro().unwrap();
    assert_eq!(actions(&back), actions(&enduro));
}

#[test]
fn jackhammer_reads_leniently() {
    let enduro = text::parse(JACKHAMMER_2015_RS);
    assert_eq!(
        enduro.title_lines().collect::<Vec<_>>(),
        ["Jackhammer", "October 18,2015", "Be Smart"]
    );
    // No keytime line.
    assert_eq!(enduro.route_sheet().key_time(), 8 * 3600);

    assert_eq!(enduro.route_sheet().len(), 72);
    assert_eq!(count(&enduro, ActionType::SpeedChange), 40);
    assert_eq!(count(&enduro, ActionType::Note), 18);
    assert_eq!(count(&enduro, ActionType::Reset), 11);
    assert_eq!(count(&enduro, ActionType::FreeTime), 2);
    assert_eq!(count(&enduro, ActionType::End), 1);
    assert_eq!(enduro.route_sheet().free_time(), 15 * 60);

    let note = enduro
        .route_sheet()
        .actions()
        .find(|a| a.note_text().is_some_and(|t| t.starts_with("Going")))
        .unwrap();
    assert_eq!(
        note.note_text(),
        Some("Going to try and make you early again only .5 mile between checks")
    );

    let end = enduro.route_sheet().get(-1).unwrap();
    assert_eq!(end.action_type(), ActionType::End);
    assert_eq!(end.start_distance(), Distance::from_units(178.7));
}

#[test]
fn jackhammer_rewrites_every_action() {
    let enduro = text::parse(JACKHAMMER_2015_RS);
    let written = text::render(&enduro);
    assert_eq!(
        normalized_action_lines(&written),
        normalized_action_lines(JACKHAMMER_2015_RS)
    );

    let again = text::parse(&written);
    assert_eq!(actions(&again), actions(&enduro));
    assert_eq!(again.title(), enduro.title());
}

#[test]
fn jackhammer_survives_the_structured_form() {
    let enduro = text::parse(JACKHAMMER_2015_RS);
    let back = record::from_json(&record::to_json(&enduro).unwrap()).unwrap();
    assert_eq!(back.title(), "Jackhammer\nOctober 18,2015\nBe Smart");
    assert_eq!(actions(&back), actions(&enduro));
    assert_eq!(back.route_sheet().length(), enduro.route_sheet().length());
    assert_eq!(
        back.route_sheet().reset_distance(),
        enduro.route_sheet().reset_distance()
    );
}

// ===========================================================================
// Printouts
// ===========================================================================

#[test]
fn printout_matches_its_route_sheet() {
    let printout = text::parse_printout(test_utils::SAMPLE_PRINTOUT).unwrap();
    let enduro = printout.record.to_enduro().unwrap();

    let report = compare_timing(&enduro, &printout);
    assert!(report.is_identical(), "{report:?}");
    assert_eq!(enduro.route_sheet().reset_distance(), printout.reset_distance);
    assert_eq!(enduro.route_sheet().free_time(), printout.free_time);
}

#[test]
fn printout_flags_a_shifted_key_time() {
    let printout = text::parse_printout(test_utils::SAMPLE_PRINTOUT).unwrap();
    let mut enduro = printout.record.to_enduro().unwrap();
    enduro.route_sheet_mut().set_key_time(9 * 3600);

    let report = compare_timing(&enduro, &printout);
    assert!(!report.key_time_matches);
    assert!(!report.is_identical());
}

#[test]
fn printout_flags_a_changed_speed() {
    let printout = text::parse_printout(test_utils::SAMPLE_PRINTOUT).unwrap();
    let rs = text::render(&printout.record.to_enduro().unwrap()).replace("6.00  24", "6.00  30");
    let enduro = text::parse(&rs);

    let report = compare_timing(&enduro, &printout);
    assert!(report.title_matches);
    assert!(!report.mismatches.is_empty());
    assert!(report.mismatches.iter().all(|m| m.index >= 2));
}
