use base64::Engine;

/// 把图片编码为 `data:image/jpeg;base64,...`
pub fn encode_data_url(bytes: &[u8]) -> String {
    format!(
        "data:image/jpeg;base64,{}",
        base64::prelude::BASE64_STANDARD.encode(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_data_url() {
        assert_eq!(encode_data_url(b"abc"), "data:image/jpeg;base64,YWJj");
        assert_eq!(encode_data_url(&[]), "data:image/jpeg;base64,");
    }
}
