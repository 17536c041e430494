//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements            | Connects to                    |
//! |-------------|-----------------------|--------------------------------|
//! | `hardware`  | OutputPort, InputPort | ESP32 LEDC PWM, GPIO           |
//! | `power`     | WakePort              | RTC wake pins, deep sleep      |
//! | `sim`       | MotorPort             | Drum motor stand-in            |
//! |             | SoundPort             | Sound engine stand-in          |
//! |             | SensorPort            | Vibration sensor stand-in      |
//! | `log_sink`  | StateObserver         | Serial log output              |
//! | `time`      | (clock)               | ESP32 high-resolution timer    |

pub mod hardware;
pub mod log_sink;
pub mod power;
pub mod sim;
pub mod time;
