/// Id is an opaque 8-byte identifier used for every row in the store:
/// accounts, repos, PRs, scans, jobs, dupe groups, and their members.
///
/// It's k-sortable: IDs minted close together in time sort close together,
/// which keeps btree indexes append-mostly under write load.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx-support", sqlx(transparent))]
pub struct Id(i64);

impl Id {
    pub fn new(v: i64) -> Self {
        Self(v)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn from_hex<T: AsRef<[u8]>>(hex: T) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex)?;
        let exact: [u8; 8] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(i64::from_be_bytes(exact)))
    }
}

impl std::str::FromStr for Id {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Id::from_hex(s.replace(':', ""))
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl serde::Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        format!("{self}").serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        let s = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        Id::from_hex(s.as_ref()).map_err(|err| D::Error::custom(format!("invalid id: {err}")))
    }
}

/// IdGenerator mints process-unique, roughly time-ordered [`Id`]s: the high
/// bits are a millisecond timestamp and the low bits are a per-millisecond
/// sequence counter, so ids minted within the same tick still sort distinctly.
pub struct IdGenerator {
    shard: u16,
    last_millis: i64,
    sequence: u16,
}

impl IdGenerator {
    pub fn new(shard: u16) -> Self {
        Self {
            shard,
            last_millis: 0,
            sequence: 0,
        }
    }

    pub fn next(&mut self, now_millis: i64) -> Id {
        if now_millis == self.last_millis {
            self.sequence = self.sequence.wrapping_add(1);
        } else {
            self.sequence = 0;
            self.last_millis = now_millis;
        }
        // 42 bits of millis, 10 bits of shard, 12 bits of sequence.
        let value = (now_millis << 22) | ((self.shard as i64 & 0x3ff) << 12) | (self.sequence as i64 & 0xfff);
        Id(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display_roundtrip() {
        let id = Id::new(0x0102030405060708);
        let text = id.to_string();
        assert_eq!(text, "0102030405060708");
        assert_eq!(text.parse::<Id>().unwrap(), id);
    }

    #[test]
    fn test_generator_is_monotonic_within_a_tick() {
        let mut gen = IdGenerator::new(7);
        let a = gen.next(1_000);
        let b = gen.next(1_000);
        let c = gen.next(1_001);
        assert!(a < b);
        assert!(b < c);
    }
}
