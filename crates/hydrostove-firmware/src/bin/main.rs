#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Ticker, Timer};
use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcChannel, AdcConfig, AdcPin, Attenuation};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::peripherals::ADC1;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info, warn};

use hydrostove_core::config::HISTORY_CAPACITY;
use hydrostove_core::{Controller, MonoFrameBuffer, PulseCounter};
use hydrostove_firmware::settings;
use hydrostove_firmware::ssd1306::{DEFAULT_ADDRESS, Ssd1306};

/// Control loop period. Temperatures are filtered and warnings evaluated at this rate.
const POLL_PERIOD: Duration = Duration::from_millis(100);

/// A button press must stay low this long to count.
const DEBOUNCE: Duration = Duration::from_millis(30);

/// The ESP32-S3 ADC is 12 bits wide; the thermistor math works on 10 bits.
const ADC_SHIFT: u32 = 2;

/// Pulses from the flow sensor, counted by `flow_task`.
static FLOW_PULSES: PulseCounter = PulseCounter::new();

/// Debounced user button presses.
static BUTTON: Signal<CriticalSectionRawMutex, ()> = Signal::new();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    error!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Count one pulse per falling edge of the flow sensor.
#[embassy_executor::task]
async fn flow_task(mut pin: Input<'static>) {
    loop {
        pin.wait_for_falling_edge().await;
        FLOW_PULSES.count();
    }
}

/// Signal a button press once it is stable, then wait for release.
#[embassy_executor::task]
async fn button_task(mut pin: Input<'static>) {
    loop {
        pin.wait_for_falling_edge().await;
        Timer::after(DEBOUNCE).await;
        if pin.is_low() {
            BUTTON.signal(());
            pin.wait_for_high().await;
            Timer::after(DEBOUNCE).await;
        }
    }
}

/// Read one thermistor channel scaled to the 10-bit domain.
///
/// A failed conversion reads as 0, which the core reports as a sensor fault.
fn read_channel<PIN>(
    adc: &mut Adc<'static, ADC1<'static>, Blocking>,
    pin: &mut AdcPin<PIN, ADC1<'static>>,
) -> u16
where
    PIN: AdcChannel,
{
    match nb::block!(adc.read_oneshot(pin)) {
        Ok(raw) => raw >> ADC_SHIFT,
        Err(()) => {
            warn!("ADC conversion failed");
            0
        }
    }
}

/// Blink the status LED forever. Used when the panel cannot be brought up.
async fn halt(mut led: Output<'static>) -> ! {
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(250)).await;
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let monitor_config = settings::monitor_config();

    // Outputs
    let led = Output::new(peripherals.GPIO13, Level::Low, OutputConfig::default());
    let buzzer = Output::new(peripherals.GPIO14, Level::Low, OutputConfig::default());
    let mut oled_reset = Output::new(peripherals.GPIO3, Level::High, OutputConfig::default());

    // Flow sensor and user button, both open-drain to ground
    let flow_pin = Input::new(
        peripherals.GPIO2,
        InputConfig::default().with_pull(Pull::Up),
    );
    let button_pin = Input::new(
        peripherals.GPIO6,
        InputConfig::default().with_pull(Pull::Up),
    );

    // Thermistor dividers on ADC1
    let mut adc_config = AdcConfig::new();
    let mut outlet_pin = adc_config.enable_pin(peripherals.GPIO7, Attenuation::_11dB);
    let mut inlet_pin = adc_config.enable_pin(peripherals.GPIO8, Attenuation::_11dB);
    let mut adc = Adc::new(peripherals.ADC1, adc_config);

    // Panel
    oled_reset.set_low();
    Timer::after(Duration::from_millis(10)).await;
    oled_reset.set_high();

    let i2c = match I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(400)),
    ) {
        Ok(i2c) => i2c
            .with_sda(peripherals.GPIO4)
            .with_scl(peripherals.GPIO5)
            .into_async(),
        Err(e) => {
            error!("I2C configuration rejected: {:?}", e);
            halt(led).await
        }
    };
    let mut display = Ssd1306::new(i2c, DEFAULT_ADDRESS);
    if let Err(e) = display.init().await {
        error!("Display init failed: {}", e);
        halt(led).await;
    }
    info!("Display initialized!");

    spawner.spawn(flow_task(flow_pin).expect("flow task already spawned"));
    spawner.spawn(button_task(button_pin).expect("button task already spawned"));

    let mut controller: Controller<Output<'static>, HISTORY_CAPACITY> =
        Controller::new(monitor_config, buzzer);
    let mut framebuffer = MonoFrameBuffer::new();

    let mut ticker = Ticker::every(POLL_PERIOD);
    loop {
        if BUTTON.try_take().is_some() {
            controller.toggle_mute();
        }

        let adc_outlet = read_channel(&mut adc, &mut outlet_pin);
        let adc_inlet = read_channel(&mut adc, &mut inlet_pin);
        let now_ms = Instant::now().as_millis();
        let outcome = controller.poll(now_ms, adc_inlet, adc_outlet, &FLOW_PULSES);

        if outcome.redraw {
            let Ok(()) = controller.draw(&mut framebuffer);
            // Errors are logged by the driver and retried on the next frame
            let _ = display.flush(&mut framebuffer).await;
        }

        ticker.next().await;
    }
}
