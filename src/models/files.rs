use serde::Serialize;

/// A file part pulled out of the multipart body, held in memory until validated.
#[derive(Debug)]
pub struct UploadedFile {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Descriptor of the file as it ended up on disk.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub filename: String,
    pub original_name: String,
    pub mimetype: String,
    pub size: u64,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::envelope::Envelope;

    #[test]
    fn success_envelope_wire_shape() {
        let stored = StoredFile {
            filename: "1700000000000-photo.webp".into(),
            original_name: "photo.jpg".into(),
            mimetype: "image/jpeg".into(),
            size: 51200,
            path: "http://localhost:3000/uploads/2023/11/1700000000000-photo.webp".into(),
        };
        let json = serde_json::to_value(Envelope::success(stored)).unwrap();

        assert_eq!(json["message"], "ok");
        assert_eq!(json["code"], 200);
        assert_eq!(json["errorCode"], 0);
        assert_eq!(json["data"]["originalName"], "photo.jpg");
        assert_eq!(json["data"]["mimetype"], "image/jpeg");
        assert_eq!(json["data"]["size"], 51200);
    }
}
