//! Aggregate a small Health Connect export and print the payload

fn main() {
    let json = r#"{
        "steps": [
            { "startTime": "2024-01-15T08:00:00Z", "endTime": "2024-01-15T09:00:00Z", "count": 4200 }
        ],
        "heartRate": [
            { "samples": [
                { "time": "2024-01-15T08:10:00Z", "beatsPerMinute": 64 },
                { "time": "2024-01-15T08:20:00Z", "beatsPerMinute": 71 }
            ] }
        ],
        "sleepSession": [
            { "startTime": "2024-01-15T00:30:00Z", "endTime": "2024-01-15T07:00:00Z", "stages": [
                { "startTime": "2024-01-15T00:30:00Z", "endTime": "2024-01-15T03:00:00Z", "stage": 4 },
                { "startTime": "2024-01-15T03:00:00Z", "endTime": "2024-01-15T04:30:00Z", "stage": 5 },
                { "startTime": "2024-01-15T04:30:00Z", "endTime": "2024-01-15T07:00:00Z", "stage": 6 }
            ] }
        ],
        "exerciseSession": [
            { "startTime": "2024-01-15T17:00:00Z", "endTime": "2024-01-15T17:35:00Z", "exerciseType": 56 }
        ]
    }"#;

    match healthfold::health_connect_to_daily_metrics(json.to_string(), 7) {
        Ok(payload) => print!("{payload}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
