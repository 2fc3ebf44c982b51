/// `config_struct!` - one declaration per config section
///
/// Each field is written as `name: Type = default`. The expansion is a plain
/// struct with public fields, a `Default` impl built from the inline values,
/// serde derives with `#[serde(default)]` (a section may list only the keys it
/// overrides) and `KEYS`, the accepted key names in declaration order. The
/// loader checks TOML tables against `KEYS` to report misspelled settings,
/// which `#[serde(default)]` would otherwise drop without a trace.
///
/// ```
/// clusterwatch::config_struct! {
///     pub struct HeartbeatConfig {
///         interval_ms: u64 = 10_000,
///         missed_limit: u32 = 2,
///     }
/// }
///
/// assert_eq!(HeartbeatConfig::default().missed_limit, 2);
/// assert_eq!(HeartbeatConfig::KEYS, &["interval_ms", "missed_limit"]);
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$attr:meta])*
        $vis:vis struct $section:ident {
            $(
                $(#[$key_attr:meta])*
                $key:ident: $ty:ty = $default:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $section {
            $(
                $(#[$key_attr])*
                pub $key: $ty,
            )*
        }

        impl $section {
            /// Key names accepted in this section
            pub const KEYS: &'static [&'static str] = &[$(stringify!($key)),*];
        }

        impl Default for $section {
            fn default() -> Self {
                Self {
                    $($key: $default,)*
                }
            }
        }
    };
}
