use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// 0x 的数量字段通常是十进制字符串，少数网关会返回裸数字，两种都接受。
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Unsigned(u64),
}

pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: ToString,
    S: Serializer,
{
    value.to_string().serialize(serializer)
}

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: FromStr,
    T::Err: std::fmt::Debug,
    D: Deserializer<'de>,
{
    let raw = match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Text(text) => text,
        StringOrNumber::Unsigned(value) => value.to_string(),
    };
    raw.trim()
        .parse()
        .map_err(|err| de::Error::custom(format!("parse error for `{raw}`: {err:?}")))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Deserialize, Serialize)]
    struct Amount {
        #[serde(with = "super")]
        value: U256,
    }

    #[test]
    fn accepts_decimal_strings_and_numbers() {
        let text: Amount = serde_json::from_value(json!({ "value": "1000000000000000000000" }))
            .expect("string amount");
        assert_eq!(text.value, U256::from(10u64).pow(U256::from(21u64)));

        let number: Amount = serde_json::from_value(json!({ "value": 42 })).expect("number amount");
        assert_eq!(number.value, U256::from(42u64));

        assert_eq!(
            serde_json::to_value(&number).expect("serialize"),
            json!({ "value": "42" })
        );
    }

    #[test]
    fn rejects_garbage() {
        let err = serde_json::from_value::<Amount>(json!({ "value": "lots" })).expect_err("garbage");
        assert!(err.to_string().contains("lots"));
    }
}
