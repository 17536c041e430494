fn main() {
    // ESP-IDF link arguments only matter for the firmware image.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
