//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::action::Action;
use crate::enduro::Enduro;
use crate::route_sheet::RouteSheet;
use crate::text;

// ===========================================================================
// Builders
// ===========================================================================

/// A route sheet with `speed` at 0 followed by `actions`, appended in order.
pub fn sheet_with(speed: u32, actions: impl IntoIterator<Item = Action>) -> RouteSheet {
    let mut sheet = RouteSheet::new(speed);
    for action in actions {
        sheet
            .append_action(action)
            .expect("append never fails past the seed");
    }
    sheet
}

/// Every action type once, two laps, key time 19:41.
pub fn all_actions_enduro() -> Enduro {
    text::parse(ALL_ACTIONS_RS)
}

/// A valid multi-lap route: each lap has `per_lap` speed changes alternating
/// between 18 and 24 every 1.2 units, a reset, a note, and ends with a reset
/// to zero (except the last, which ends with `end`).
pub fn long_route(laps: usize, per_lap: usize) -> Enduro {
    let mut actions = Vec::new();
    for lap in 0..laps {
        let mut distance = 0.0;
        for n in 0..per_lap {
            distance += 1.2;
            let speed = if n % 2 == 0 { 24.0 } else { 18.0 };
            actions.push(Action::speed_change(distance, speed));
        }
        actions.push(Action::reset(distance + 0.15, distance + 0.75));
        actions.push(Action::note(distance + 0.2, "CHECK"));
        distance += 1.2;
        actions.push(if lap + 1 == laps {
            Action::end(distance)
        } else {
            Action::reset_to_zero(distance)
        });
    }
    let mut sheet = sheet_with(18, actions);
    sheet.clear_event_log();
    Enduro::with_title(format!("Long Route\n{laps} laps"), sheet)
}

// ===========================================================================
// Canonical route texts
// ===========================================================================

/// Reproduced byte for byte by [`text::render`].
pub const GREEN_MARBLE_RS: &str = "# Enduro Route Sheet
     title Green Marble 2003
   keytime   8:00
     speed   0.00  18
     speed  23.10  30
     reset  23.69  24.05
     reset  26.47  31.60
     speed  31.60  18
     speed  50.80  24
     speed  58.40  18
     reset  59.46  63.56
     reset  68.16  69.66
     reset  76.12  78.19
     reset  84.68  87.08
     reset  87.79  88.09
     reset  89.02  89.27
     speed  90.20  24
     reset  94.60  98.90
       end 106.20
";

pub const ALL_ACTIONS_RS: &str = "# Enduro Route Sheet
     title First Title Line
    title2 Second Title Line
    title3 And finally the third title line
   keytime  19:41
     speed   0.00  30
     reset   3.31  3.96
 free_time   4.00  5
      note   4.30  sadf
   reset_0   9.00
  gas_stop   3.00
     known   7.00
 free_zone   8.50  10.87
     start   9.00
       end  12.00
";

/// Two laps, 226 JART rows.
pub const FOGGY_MOUNTAIN_RS: &str = "title Foggy Mountain
title2 2003
speed   0.00  24
reset   0.60   3.20
speed   5.20  18
speed   8.80  24
speed  15.20  18
reset  15.85  20.30
speed  21.20  24
speed  24.40  18
reset  24.70  28.60
speed  30.70  24
reset  34.70  38.70
speed  38.70  18
reset  41.10  45.60
speed  49.80  30
speed  55.30  18
free_time  56.20  30
reset_0  56.20
speed   0.00  24
speed   4.00  18
reset   5.05   8.05
speed   7.90  24
speed  13.10  18
reset  14.00  18.50
speed  20.30  24
speed  27.90  18
reset  28.20  32.70
reset  34.00  37.00
speed  38.70  24
reset  46.30  54.30
speed  55.10  30
speed  60.60  18
end  61.50
";

pub const PINE_HILL_RS: &str = "# Enduro Route Sheet
  title Pine Hill Enduro    May 2nd 2004  KEYTIME 9:00 a.m.
  keytime   9:00
  speed   0.00  20
  speed   3.00  15
  speed   4.00  20
  speed   6.00   6
  speed   6.30  15
  reset   7.96   9.90
  speed  23.80  30
  reset  26.49  27.29
  speed  27.30  18
  reset  27.58  31.57
  speed  49.50   6
  note  49.80 START CONTROL
  speed  49.80  12
  note  50.12 GAS AVAILABLE
  reset  50.12  55.21
  note  56.00 START CONTROL
  speed  56.00  24
  reset  56.60  58.60
  reset  70.00  72.00
  speed  72.40  15
  speed  73.90  18
  speed  77.80  24
  speed  79.80  30
  speed  81.30  18
  reset  81.39  85.87
    end  99.30
";

/// [`PINE_HILL_RS`] as a version 1 record.
pub const PINE_HILL_V1_JSON: &str = r#"{"title":"Pine Hill Enduro May 2nd 2004 KEYTIME 9:00 a.m.","keyTime":32400,"actions":[{"type":{"speed":true},"distance":0,"speed":20},{"type":{"speed":true},"distance":3,"speed":15},{"type":{"speed":true},"distance":4,"speed":20},{"type":{"speed":true},"distance":6,"speed":6},{"type":{"speed":true},"distance":6.3,"speed":15},{"type":{"reset":true},"distance":7.96,"toDistance":9.9},{"type":{"speed":true},"distance":23.8,"speed":30},{"type":{"reset":true},"distance":26.49,"toDistance":27.29},{"type":{"speed":true},"distance":27.3,"speed":18},{"type":{"reset":true},"distance":27.58,"toDistance":31.57},{"type":{"speed":true},"distance":49.5,"speed":6},{"type":{"note":true},"distance":49.8,"note":"START CONTROL"},{"type":{"speed":true},"distance":49.8,"speed":12},{"type":{"note":true},"distance":50.12,"note":"GAS AVAILABLE"},{"type":{"reset":true},"distance":50.12,"toDistance":55.21},{"type":{"note":true},"distance":56,"note":"START CONTROL"},{"type":{"speed":true},"distance":56,"speed":24},{"type":{"reset":true},"distance":56.6,"toDistance":58.6},{"type":{"reset":true},"distance":70,"toDistance":72},{"type":{"speed":true},"distance":72.4,"speed":15},{"type":{"speed":true},"distance":73.9,"speed":18},{"type":{"speed":true},"distance":77.8,"speed":24},{"type":{"speed":true},"distance":79.8,"speed":30},{"type":{"speed":true},"distance":81.3,"speed":18},{"type":{"reset":true},"distance":81.39,"toDistance":85.87},{"type":{"end":true},"distance":99.3}]}"#;

/// [`PINE_HILL_RS`] as a version 2 record.
pub const PINE_HILL_V2_JSON: &str = r#"{"version": "2", "title":"Pine Hill Enduro May 2nd 2004 KEYTIME 9:00 a.m.","routeSheet":{"keyTime":32400,"actions":[{"type":"speedChange","distance":0,"speed":20},{"type":"speedChange","distance":3,"speed":15},{"type":"speedChange","distance":4,"speed":20},{"type":"speedChange","distance":6,"speed":6},{"type":"speedChange","distance":6.3,"speed":15},{"type":"reset","distance":7.96,"toDistance":9.9},{"type":"speedChange","distance":23.8,"speed":30},{"type":"reset","distance":26.49,"toDistance":27.29},{"type":"speedChange","distance":27.3,"speed":18},{"type":"reset","distance":27.58,"toDistance":31.57},{"type":"speedChange","distance":49.5,"speed":6},{"type":"note","distance":49.8,"note":"START CONTROL"},{"type":"speedChange","distance":49.8,"speed":12},{"type":"note","distance":50.12,"note":"GAS AVAILABLE"},{"type":"reset","distance":50.12,"toDistance":55.21},{"type":"note","distance":56,"note":"START CONTROL"},{"type":"speedChange","distance":56,"speed":24},{"type":"reset","distance":56.6,"toDistance":58.6},{"type":"reset","distance":70,"toDistance":72},{"type":"speedChange","distance":72.4,"speed":15},{"type":"speedChange","distance":73.9,"speed":18},{"type":"speedChange","distance":77.8,"speed":24},{"type":"speedChange","distance":79.8,"speed":30},{"type":"speedChange","distance":81.3,"speed":18},{"type":"reset","distance":81.39,"toDistance":85.87},{"type":"end","distance":99.3}]}}"#;

/// Printout of `speed 0 18; reset 3 4; speed 6 24; free_time 7 5; known 9;
/// note 10; end 12` keyed at 8:00.
pub const SAMPLE_PRINTOUT: &str = "Sample Printout
Line Two

Time      Dist  Action
08:00:00   0.00 Speed 18   6.00  6.00 08:20:00
08:10:00   3.00 Reset To  4.00   1.00  4.00 08:13:20
08:20:00   6.00 Speed 24   6.00 12.00 08:40:00
08:22:30   7.00 Free Time   5 08:27:30
08:32:30   9.00 Known
08:35:00  10.00 Note CHECK FUEL
08:40:00  12.00 End
";
