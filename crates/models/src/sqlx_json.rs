/// Implements `sqlx::{Type, Decode, Encode}` for a given type as a plain
/// Postgres `json` column (never `jsonb`) so that callers can compare
/// raw JSON text directly where needed, e.g. when verifying that a
/// persisted `phase_cursor` round-trips byte-for-byte in a test.
///
/// The given type must already implement `serde::{Serialize, Deserialize}`.
macro_rules! sqlx_json {
    ($rust_type:ty) => {
        #[cfg(feature = "sqlx-support")]
        impl sqlx::Type<sqlx::Postgres> for $rust_type {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                sqlx::postgres::PgTypeInfo::with_name("JSON")
            }
            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                *ty == Self::type_info()
            }
        }

        #[cfg(feature = "sqlx-support")]
        impl<'a> sqlx::Decode<'a, sqlx::Postgres> for $rust_type {
            fn decode(value: sqlx::postgres::PgValueRef<'a>) -> Result<Self, sqlx::error::BoxDynError> {
                <sqlx::types::Json<$rust_type> as sqlx::Decode<'a, sqlx::Postgres>>::decode(value)
                    .map(|t| t.0)
            }
        }

        #[cfg(feature = "sqlx-support")]
        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $rust_type {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <sqlx::types::Json<&Self> as sqlx::Encode<'q, sqlx::Postgres>>::encode(
                    sqlx::types::Json(self),
                    buf,
                )
            }
        }
    };
}

pub(crate) use sqlx_json;
