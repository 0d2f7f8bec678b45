//! Generate result envelopes for validation testing

use chrono::{Duration, TimeZone, Utc};
use synheart_stress::{Sample, StressProcessor};

fn main() {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
    let samples: Vec<Sample> = (0..36)
        .map(|i| {
            let ibi = if i % 2 == 0 { vec![790.0, 850.0] } else { vec![820.0, 760.0] };
            Sample::new("polar-h10", "validation-test", t0 + Duration::seconds(i))
                .with_hr(72.0 + (i % 5) as f64)
                .with_ibi(ibi)
        })
        .collect();

    let mut processor = StressProcessor::new();
    match processor.process_batch(samples) {
        Ok(payloads) => {
            for payload in payloads {
                match serde_json::to_string(&payload) {
                    Ok(json) => println!("{json}"),
                    Err(e) => eprintln!("Error: {e:?}"),
                }
            }
        }
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
