use serde::Serialize;
use uuid::Uuid;

/// Opaque admission code embedded in the ticket QR. The event and seat ids
/// make scanner-side sanity checks cheap; the uuid tail keeps codes
/// unguessable.
pub fn generate_code(event_id: i32, seat_id: i32) -> String {
    format!("TKT-{event_id}-{seat_id}-{}", Uuid::new_v4().simple())
}

#[derive(Serialize, Debug)]
pub struct QrPayload<'a> {
    pub code: &'a str,
    pub event_id: i32,
    pub row_number: i32,
    pub seat_number: i32,
}

/// JSON payload the client renders into a QR image.
pub fn qr_payload(code: &str, event_id: i32, row_number: i32, seat_number: i32) -> String {
    serde_json::to_string(&QrPayload {
        code,
        event_id,
        row_number,
        seat_number,
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_carry_event_and_seat() {
        let code = generate_code(7, 42);
        assert!(code.starts_with("TKT-7-42-"));
    }

    #[test]
    fn codes_are_unique() {
        assert_ne!(generate_code(1, 1), generate_code(1, 1));
    }

    #[test]
    fn qr_payload_is_valid_json() {
        let payload = qr_payload("TKT-1-2-abc", 1, 3, 12);
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["code"], "TKT-1-2-abc");
        assert_eq!(value["seat_number"], 12);
    }
}
