// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! ESP-IDF C entry points used by the ESP32 backend

use core::ffi::{c_char, c_void};

pub type EspErr = i32;
pub type NvsHandle = u32;

pub const ESP_OK: EspErr = 0;
pub const ESP_ERR_NVS_NOT_FOUND: EspErr = 0x1102;
pub const ESP_ERR_NVS_NO_FREE_PAGES: EspErr = 0x110D;
pub const ESP_ERR_NVS_NEW_VERSION_FOUND: EspErr = 0x1110;

pub const NVS_READWRITE: u32 = 1;

/// `esp_sleep_source_t::ESP_SLEEP_WAKEUP_TIMER`
pub const ESP_SLEEP_WAKEUP_TIMER: u32 = 4;

/// `esp_sleep_pd_domain_t::ESP_PD_DOMAIN_RTC_PERIPH`
pub const ESP_PD_DOMAIN_RTC_PERIPH: u32 = 0;
/// `esp_sleep_pd_option_t::ESP_PD_OPTION_OFF`
pub const ESP_PD_OPTION_OFF: u32 = 0;

/// `esp_reset_reason_t`
pub const ESP_RST_POWERON: u32 = 1;
pub const ESP_RST_SW: u32 = 3;

extern "C" {
    pub fn nvs_flash_init() -> EspErr;
    pub fn nvs_flash_erase() -> EspErr;
    pub fn nvs_open(namespace: *const c_char, mode: u32, handle: *mut NvsHandle) -> EspErr;
    pub fn nvs_get_blob(
        handle: NvsHandle,
        key: *const c_char,
        out: *mut c_void,
        length: *mut usize,
    ) -> EspErr;
    pub fn nvs_set_blob(
        handle: NvsHandle,
        key: *const c_char,
        value: *const c_void,
        length: usize,
    ) -> EspErr;
    pub fn nvs_erase_key(handle: NvsHandle, key: *const c_char) -> EspErr;
    pub fn nvs_commit(handle: NvsHandle) -> EspErr;

    pub fn esp_sleep_enable_timer_wakeup(time_us: u64) -> EspErr;
    pub fn esp_sleep_pd_config(domain: u32, option: u32) -> EspErr;
    pub fn esp_sleep_get_wakeup_cause() -> u32;
    pub fn esp_deep_sleep_start() -> !;
    pub fn esp_reset_reason() -> u32;

    pub fn esp_rom_delay_us(us: u32);
    pub fn esp_timer_get_time() -> i64;
}
