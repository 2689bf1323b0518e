//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements           | Connects to               |
//! |-----------------|----------------------|---------------------------|
//! | `hardware`      | ThermalImagerPort    | AMG8833 over I2C          |
//! |                 | ObjectDetectorPort   | AI camera over UART2      |
//! |                 | BuzzerPort           | LEDC PWM via `buzz-q`     |
//! |                 | DispenserPort        | LEDC PWM via `feed-q`     |
//! | `sms_notifier`  | AlertNotifierPort    | GSM modem via `gsm-q`     |
//! | `detection_log` | RecordsStorePort     | NVS detection ring        |
//! | `log_sink`      | EventSink            | Serial log output         |
//! | `nvs`           | ConfigPort           | NVS / in-memory store     |
//! |                 | StoragePort          |                           |
//! | `time`          | (uptime/wall clock)  | ESP32 system timer        |

pub mod detection_log;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod sms_notifier;
pub mod time;
