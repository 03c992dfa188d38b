//! JSON has no literal for infinities or NaN. Finite values are written as numbers, the rest as
//! the strings `"NaN"`, `"inf"` and `"-inf"`. Use through `#[serde(with = "...")]`.

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};
use std::fmt;

const NAN: &str = "NaN";
const INF: &str = "inf";
const NEG_INF: &str = "-inf";

struct Float(f64);

impl Serialize for Float {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_finite() {
            serializer.serialize_f64(v)
        } else if v.is_nan() {
            serializer.serialize_str(NAN)
        } else if v > 0. {
            serializer.serialize_str(INF)
        } else {
            serializer.serialize_str(NEG_INF)
        }
    }
}

struct FloatVisitor;

impl Visitor<'_> for FloatVisitor {
    type Value = Float;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or one of \"NaN\", \"inf\", \"-inf\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Float, E> {
        Ok(Float(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Float, E> {
        Ok(Float(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Float, E> {
        Ok(Float(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Float, E> {
        match v {
            NAN => Ok(Float(f64::NAN)),
            INF => Ok(Float(f64::INFINITY)),
            NEG_INF => Ok(Float(f64::NEG_INFINITY)),
            other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
        }
    }
}

impl<'de> Deserialize<'de> for Float {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FloatVisitor)
    }
}

pub mod vec {
    use super::Float;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| Float(*v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let floats = Vec::<Float>::deserialize(deserializer)?;
        Ok(floats.into_iter().map(|f| f.0).collect())
    }
}

pub mod option_vec {
    use super::Float;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        values: &Option<Vec<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match values {
            Some(values) => super::vec::serialize(values, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<f64>>, D::Error> {
        let floats = Option::<Vec<Float>>::deserialize(deserializer)?;
        Ok(floats.map(|floats| floats.into_iter().map(|f| f.0).collect()))
    }
}

#[cfg(test)]
mod test {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Values {
        #[serde(with = "super::vec")]
        values: Vec<f64>,
        #[serde(default, with = "super::option_vec")]
        extra: Option<Vec<f64>>,
    }

    #[test]
    fn non_finite_values_become_strings() {
        let values = Values {
            values: vec![1.5, f64::INFINITY, f64::NEG_INFINITY, f64::NAN],
            extra: None,
        };
        assert_eq!(
            serde_json::to_value(&values).unwrap(),
            json!({ "values": [1.5, "inf", "-inf", "NaN"], "extra": null })
        );
    }

    #[test]
    fn strings_and_integers_decode() {
        let values: Values =
            serde_json::from_value(json!({ "values": [2, -3, "inf", "NaN"], "extra": ["-inf"] }))
                .unwrap();
        assert_eq!(&values.values[..3], &[2., -3., f64::INFINITY]);
        assert!(values.values[3].is_nan());
        assert_eq!(values.extra, Some(vec![f64::NEG_INFINITY]));

        let missing: Values = serde_json::from_value(json!({ "values": [] })).unwrap();
        assert_eq!(missing.extra, None);
    }

    #[test]
    fn null_and_unknown_strings_are_rejected() {
        assert!(serde_json::from_value::<Values>(json!({ "values": [null] })).is_err());
        assert!(serde_json::from_value::<Values>(json!({ "values": ["infinity"] })).is_err());
    }
}
