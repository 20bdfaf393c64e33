#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_time::{Instant, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::pcnt::Pcnt;
use esp_hal::rng::Rng;
use esp_hal::system::Stack;
use esp_hal::timer::timg::TimerGroup;
use esp_rtos::embassy::Executor;
use log::{info, warn};
use static_cell::StaticCell;

// Display-LCD panel specific imports
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::spi::master::{Config, Spi};
use mipidsi::interface::SpiInterface;
use mipidsi::{Builder as MipidsiBuilder, models::ILI9342CRgb565};

use geiger_core::config::{
    CONSUMER_LOOP_MS, PRODUCER_LOOP_MS, PipelineConfig, STATUS_INTERVAL_MS,
};
use geiger_core::{Consumer, Dashboard, Producer, SettingsStore, SharedGate, SharedState};
use geiger_firmware::buzzer::{SignalBuzzer, TONE_SIGNAL, buzzer_task};
use geiger_firmware::control::{CONTROL_CHANNEL, ControlEvent};
use geiger_firmware::pcnt::PcntCounter;
use geiger_firmware::settings_store::{FixedTimeSource, SdSettingsStore};
use geiger_firmware::wifi::{net_task, wifi_task};

const DISPLAY_WIDTH: u16 = 320;
const DISPLAY_HEIGHT: u16 = 240;

const APP_CORE_STACK_SIZE: usize = 8192;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

/// Pulse sampling, pinned to the app core.
#[embassy_executor::task]
async fn producer_task(counter: PcntCounter<'static>, gate: &'static SharedGate) {
    let config = PipelineConfig::default();
    let mut producer = Producer::new(counter, &config, now_ms());
    info!("Producer running on core 1");

    loop {
        producer.step(gate, now_ms()).await;
        Timer::after_millis(PRODUCER_LOOP_MS).await;
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

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let pipeline_config = PipelineConfig::default();
    static GATE: StaticCell<SharedGate> = StaticCell::new();
    let gate: &'static SharedGate =
        GATE.init(SharedGate::new(SharedState::new(&pipeline_config, now_ms())));

    // Settings live on the SD card (SPI3)
    let sd_spi = Spi::new(peripherals.SPI3, Config::default())
        .expect("Failed to configure SD card SPI")
        .with_sck(peripherals.GPIO40)
        .with_mosi(peripherals.GPIO41)
        .with_miso(peripherals.GPIO39);
    let sd_cs = Output::new(peripherals.GPIO42, Level::High, OutputConfig::default());
    let sd_device =
        ExclusiveDevice::new_no_delay(sd_spi, sd_cs).expect("Failed to create SD card device");
    let sd_card = embedded_sdmmc::SdCard::new(sd_device, Delay::new());
    let mut settings_store = SdSettingsStore::new(sd_card, FixedTimeSource);
    let mut settings = settings_store.load_or_default();

    // Pulse counter, handed to the app core
    let pcnt = Pcnt::new(peripherals.PCNT);
    let counter =
        PcntCounter::new(pcnt.unit0, peripherals.GPIO9).expect("Failed to configure pulse counter");

    let sw_ints = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    static APP_CORE_STACK: StaticCell<Stack<APP_CORE_STACK_SIZE>> = StaticCell::new();
    let app_core_stack = APP_CORE_STACK.init(Stack::new());
    esp_rtos::start_second_core(
        peripherals.CPU_CTRL,
        sw_ints.software_interrupt0,
        sw_ints.software_interrupt1,
        app_core_stack,
        move || {
            static EXECUTOR: StaticCell<Executor> = StaticCell::new();
            let executor = EXECUTOR.init(Executor::new());
            executor.run(|spawner| {
                spawner.must_spawn(producer_task(counter, gate));
            });
        },
    );

    // Buzzer
    let buzzer_pin = Output::new(peripherals.GPIO38, Level::Low, OutputConfig::default());
    spawner.must_spawn(buzzer_task(buzzer_pin, &TONE_SIGNAL));

    // WiFi
    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    let radio_init =
        RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));
    let (wifi_controller, interfaces) =
        esp_radio::wifi::new(radio_init, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    static NET_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::new()),
        seed,
    );
    spawner.must_spawn(net_task(runner));
    spawner.must_spawn(wifi_task(wifi_controller, settings.auto_connect_on_startup));

    // Configure and initialize the display

    // 1. Configure SPI bus
    let spi_bus = Spi::new(peripherals.SPI2, Config::default())
        .expect("Failed to configure display SPI")
        .with_sck(peripherals.GPIO36)
        .with_mosi(peripherals.GPIO37);

    // 2. Create a dummy CS pin (we don't use hardware CS for this display)
    let cs = Output::new(peripherals.GPIO35, Level::High, OutputConfig::default());

    // 3. Wrap the SPI bus as a SPI device (required by embedded-hal traits)
    let spi_device =
        ExclusiveDevice::new_no_delay(spi_bus, cs).expect("Failed to create display device");

    // 4. Set up DC (Data/Command) pin
    let dc = Output::new(peripherals.GPIO34, Level::Low, OutputConfig::default());

    // 5. Create a buffer for SPI batching (larger = faster, uses more RAM)
    let mut spi_buffer = [0u8; 64];

    // 6. Create display interface
    let di = SpiInterface::new(spi_device, dc, &mut spi_buffer);

    // 7. Build and initialize the display driver
    let display = MipidsiBuilder::new(ILI9342CRgb565, di)
        .display_size(DISPLAY_WIDTH, DISPLAY_HEIGHT)
        .init(&mut embassy_time::Delay)
        .expect("Failed to initialize display");

    info!("Display initialized!");

    let mut dashboard = Dashboard::new(display);
    dashboard.clear();

    // Consumer loop on this core
    let mut consumer = Consumer::new(&pipeline_config, now_ms());
    let mut buzzer = SignalBuzzer::new(&TONE_SIGNAL);
    let mut alarm_config = settings.alarm_config();
    let mut last_status = 0u64;

    loop {
        while let Ok(event) = CONTROL_CHANNEL.try_receive() {
            match event {
                ControlEvent::Settings(change) => {
                    if change.apply(&mut settings) {
                        alarm_config = settings.alarm_config();
                        info!("Alarm config updated: {:?}", alarm_config);
                    }
                    if let Err(e) = settings_store.save(&settings) {
                        warn!("Failed to persist settings: {}", e);
                    }
                }
                ControlEvent::ResetDose => consumer.reset(gate, now_ms()).await,
            }
        }

        let now = now_ms();
        let report = consumer.step(gate, now, &alarm_config, &mut buzzer).await;
        report.publish(&mut dashboard);

        if now.saturating_sub(last_status) >= STATUS_INTERVAL_MS {
            last_status = now;
            info!(
                "{:.0} CPM | {:.3} uSv/h | dose {:.6} mSv | {} counts | net {}",
                report.cpm,
                report.stats.current_rate,
                report.stats.cumulative_dose,
                report.stats.total_counts,
                if stack.is_config_up() { "up" } else { "down" }
            );
        }

        Timer::after_millis(CONSUMER_LOOP_MS).await;
    }
}
