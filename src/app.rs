use crate::charts::{ChartCache, SeriesChart};
use crate::config::Config;
use crate::connection::ConnectionCommand;
use crate::dashboard::{Dashboard, LinkState, SerialState};
use crate::error::ScanError;
use crate::port_scanner::{scan_ports, SerialPortEntry};
use crate::transport::{TransportEvent, TransportKind};
use crate::ui::styles;
use crossbeam_channel::{Receiver, Sender};
use iced::widget::{button, column, container, row, scrollable, slider, text, Space};
use iced::{Color, Element, Length, Subscription, Task};
use plotters_iced::ChartWidget;

// Iced Application State
pub struct PulseScope {
    dashboard: Dashboard,
    receiver: Receiver<TransportEvent>,
    available_ports: Vec<SerialPortEntry>,
    selected_port: Option<SerialPortEntry>,
    scanning: bool,
    scan_message: Option<String>,
    frequency_hz: u8,
    waveform_cache: ChartCache,
    heart_rate_cache: ChartCache,
    spo2_cache: ChartCache,
}

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    ConnectSocket,
    ScanPorts,
    PortsScanned(Result<Vec<SerialPortEntry>, ScanError>),
    SelectPort(SerialPortEntry),
    OpenSerial,
    Reset,
    FrequencyChanged(u8),
    FrequencyReleased,
}

impl PulseScope {
    pub fn new(
        receiver: Receiver<TransportEvent>,
        commands: Sender<ConnectionCommand>,
        config: &Config,
    ) -> (Self, Task<Message>) {
        let dashboard = Dashboard::new(commands);
        if config.enable_autoconnect {
            dashboard.connect_socket();
        }

        (
            PulseScope {
                dashboard,
                receiver,
                available_ports: Vec::new(),
                selected_port: None,
                scanning: true,
                scan_message: None,
                frequency_hz: config.initial_frequency(),
                waveform_cache: ChartCache::new(),
                heart_rate_cache: ChartCache::new(),
                spo2_cache: ChartCache::new(),
            },
            Task::perform(scan_ports(), Message::PortsScanned),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                // Process all pending events without blocking
                for event in self.receiver.try_iter() {
                    self.dashboard.handle_event(event);
                }
                if self.dashboard.take_redraw() {
                    let session = self.dashboard.session();
                    self.waveform_cache.sync(session, self.dashboard.waveform());
                    self.heart_rate_cache.sync(session, self.dashboard.heart_rate());
                    self.spo2_cache.sync(session, self.dashboard.spo2());
                }
                Task::none()
            }
            Message::ConnectSocket => {
                self.dashboard.connect_socket();
                Task::none()
            }
            Message::ScanPorts => {
                self.scanning = true;
                self.scan_message = None;
                self.available_ports.clear();
                Task::perform(scan_ports(), Message::PortsScanned)
            }
            Message::PortsScanned(result) => {
                self.scanning = false;
                match result {
                    Ok(ports) => {
                        log::info!("Found {} serial port(s)", ports.len());
                        if let Some(selected) = &self.selected_port {
                            if !ports.contains(selected) {
                                self.selected_port = None;
                            }
                        }
                        self.available_ports = ports;
                    }
                    Err(e) => {
                        log::warn!("Serial port scan: {}", e);
                        self.scan_message = Some(e.to_string());
                    }
                }
                Task::none()
            }
            Message::SelectPort(port) => {
                self.selected_port = Some(port);
                Task::none()
            }
            Message::OpenSerial => {
                if let Some(port) = &self.selected_port {
                    self.dashboard.select_serial(port.name.clone());
                }
                Task::none()
            }
            Message::Reset => {
                self.dashboard.reset();
                Task::none()
            }
            Message::FrequencyChanged(hz) => {
                self.frequency_hz = hz;
                Task::none()
            }
            Message::FrequencyReleased => {
                if self.dashboard.set_frequency(self.frequency_hz) {
                    log::info!("Requested {} Hz sample frequency", self.frequency_hz);
                }
                Task::none()
            }
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        iced::time::every(std::time::Duration::from_millis(16)).map(|_| Message::Tick)
    }

    pub fn view(&'_ self) -> Element<'_, Message> {
        let sidebar = self.create_sidebar();
        let main_content = column![self.create_status_bar(), self.create_main_view()]
            .spacing(10)
            .padding(20)
            .width(Length::Fill);

        let content = row![sidebar, main_content].spacing(0);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn serial_locked(&self) -> bool {
        matches!(self.dashboard.serial(), SerialState::Opening(_) | SerialState::Open(_))
    }

    fn create_sidebar(&self) -> Element<'_, Message> {
        let link_controls = column![
            text("WebSocket").size(20),
            button(text("Connect WebSocket"))
                .on_press_maybe(match self.dashboard.link() {
                    LinkState::Connected | LinkState::Connecting => None,
                    _ => Some(Message::ConnectSocket),
                })
                .padding(10)
                .width(Length::Fill)
                .style(styles::connect_button_style()),
        ]
        .spacing(10);

        let scan_button = button(text(if self.scanning { "Scanning..." } else { "Scan Serial Ports" }))
            .on_press_maybe(if self.scanning { None } else { Some(Message::ScanPorts) })
            .padding(10)
            .width(Length::Fill);

        let port_list: Element<'_, Message> = if self.available_ports.is_empty() {
            let hint = self
                .scan_message
                .as_deref()
                .unwrap_or("No ports found. Click 'Scan Serial Ports' to search.");
            text(hint.to_string()).size(14).into()
        } else {
            let locked = self.serial_locked();
            let ports = self.available_ports.iter().map(|port| {
                let is_selected = self.selected_port.as_ref() == Some(port);
                button(text(port.to_string()).size(14))
                    .on_press_maybe(if locked { None } else { Some(Message::SelectPort(port.clone())) })
                    .width(Length::Fill)
                    .padding(10)
                    .style(styles::port_button_style(is_selected))
                    .into()
            });

            scrollable(column(ports).spacing(5)).height(Length::Fill).into()
        };

        let open_button = match (self.dashboard.serial(), &self.selected_port) {
            (SerialState::Opening(_), _) => button(text("Opening...")).padding(10).width(Length::Fill),
            (SerialState::Open(name), _) => button(text(format!("Reading {}", name))).padding(10).width(Length::Fill),
            (_, Some(_)) => button(text("Open Serial"))
                .on_press(Message::OpenSerial)
                .padding(10)
                .width(Length::Fill)
                .style(styles::connect_button_style()),
            (_, None) => button(text("Select a port")).padding(10).width(Length::Fill),
        };

        let serial_error: Element<'_, Message> = match self.dashboard.serial() {
            SerialState::Failed(reason) => text(reason.clone()).size(12).color(styles::POOR).into(),
            _ => Space::with_height(Length::Fixed(0.0)).into(),
        };

        let reset_button = button(text("Reset"))
            .on_press(Message::Reset)
            .padding(10)
            .width(Length::Fill)
            .style(styles::reset_button_style());

        let sidebar_content = column![
            link_controls,
            text("USB Serial").size(20),
            scan_button,
            port_list,
            open_button,
            serial_error,
            self.create_frequency_control(),
            reset_button,
        ]
        .spacing(10)
        .padding(20)
        .width(300);

        container(sidebar_content)
            .style(container::bordered_box)
            .width(Length::Fixed(300.0))
            .height(Length::Fill)
            .into()
    }

    fn create_frequency_control(&self) -> Element<'_, Message> {
        let label = text(format!("Sample Frequency: {} Hz", self.frequency_hz)).size(14);

        if self.dashboard.mode() == TransportKind::Serial {
            return column![
                label,
                text("Frequency control is only available over WebSocket")
                    .size(12)
                    .color(styles::NEUTRAL),
            ]
            .spacing(5)
            .into();
        }

        column![
            label,
            slider(1..=100, self.frequency_hz, Message::FrequencyChanged).on_release(Message::FrequencyReleased),
        ]
        .spacing(5)
        .into()
    }

    fn create_status_bar(&self) -> Element<'_, Message> {
        let readouts = self.dashboard.readouts();

        let pulse = row![
            text("\u{25CF}").color(styles::pulse_color(self.dashboard.pulse_state())),
            text(readouts.status_text.clone()),
        ]
        .spacing(6);

        let rssi = match readouts.signal_strength {
            Some(dbm) => format!("RSSI: {} dBm", dbm),
            None => "RSSI: --".to_string(),
        };

        let link = self.dashboard.link();
        let link_text = match link {
            LinkState::Connected => "WebSocket: Connected".to_string(),
            LinkState::Connecting => "WebSocket: Connecting...".to_string(),
            LinkState::Disconnected => "WebSocket: Disconnected".to_string(),
            LinkState::Failed(reason) => format!("WebSocket: {}", reason),
        };

        let last_update = match self.dashboard.last_update() {
            Some(at) => format!("Last update: {}", at.format("%H:%M:%S")),
            None => "Last update: --".to_string(),
        };

        let counters = format!(
            "Frames: {} applied / {} dropped",
            self.dashboard.frames_applied(),
            self.dashboard.frames_dropped()
        );

        row![
            pulse,
            text(rssi),
            text(link_text).color(styles::link_color(link)),
            text(format!("Source: {}", self.dashboard.mode().label())),
            text(last_update).color(styles::NEUTRAL),
            text(counters).color(styles::NEUTRAL),
        ]
        .spacing(20)
        .into()
    }

    fn create_main_view(&self) -> Element<'_, Message> {
        let readouts = self.dashboard.readouts();

        let waveform_chart = ChartWidget::new(SeriesChart::waveform(self.dashboard.waveform(), self.waveform_cache.cache()))
            .width(Length::Fill)
            .height(Length::FillPortion(2));

        let hr_chart = ChartWidget::new(SeriesChart::heart_rate(self.dashboard.heart_rate(), self.heart_rate_cache.cache()))
            .width(Length::FillPortion(3))
            .height(Length::Fill);

        let spo2_chart = ChartWidget::new(SeriesChart::spo2(self.dashboard.spo2(), self.spo2_cache.cache()))
            .width(Length::FillPortion(3))
            .height(Length::Fill);

        let hr_row = row![
            hr_chart,
            metric_card("Heart Rate", readouts.heart_rate.clone(), "BPM", styles::BPM),
        ]
        .spacing(10)
        .height(Length::FillPortion(1));

        let spo2_row = row![
            spo2_chart,
            metric_card("SpO2", readouts.spo2.clone(), "%", styles::SPO2),
        ]
        .spacing(10)
        .height(Length::FillPortion(1));

        let confidence_color = styles::confidence_color(readouts.confidence_level);
        let cards = row![
            metric_card("HRV (RMSSD)", readouts.hrv.clone(), "ms", styles::HRV),
            metric_card("Perfusion Index", readouts.perfusion_index.clone(), "", styles::PERFUSION),
            metric_card("Confidence", readouts.confidence.clone(), "", confidence_color),
            metric_card("Temperature", readouts.temperature.clone(), "\u{00B0}C", styles::TEMPERATURE),
        ]
        .spacing(10);

        column![waveform_chart, hr_row, spo2_row, cards]
            .spacing(10)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}

fn metric_card<'a>(title: &'a str, value: String, unit: &'a str, color: Color) -> Element<'a, Message> {
    let content = column![
        text(title).size(14).color(styles::NEUTRAL),
        row![text(value).size(32).color(color), text(unit).size(14)]
            .spacing(4)
            .align_y(iced::alignment::Vertical::Bottom),
    ]
    .spacing(4)
    .padding(12);

    container(content)
        .style(container::bordered_box)
        .width(Length::FillPortion(1))
        .into()
}
