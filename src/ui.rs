//! Desktop window

use crate::app::{Orchestrator, Services};
use crate::config::{AppConfig, SettingsStore};
use crate::dialog::MessageBox;
use crate::input::{self, EditAction, ShortcutAction, ShortcutHandler};
use iced::keyboard;
use iced::widget::{button, column, container, image, mouse_area, pick_list, row, text, text_input};
use iced::{Alignment, Element, Event, Length, Subscription, Task};

/// Initial window size
pub const WINDOW_WIDTH: f32 = 500.0;
pub const WINDOW_HEIGHT: f32 = 400.0;

#[derive(Debug, Clone)]
pub enum Message {
    LinkChanged(String),
    Download,
    Print,
    PrinterSelected(String),
    ToggleEditMenu,
    Edit(EditAction),
    EventOccurred(Event),
}

pub struct QrPrinterApp {
    orchestrator: Orchestrator,
    link: String,
    edit_menu_open: bool,
    shortcuts: ShortcutHandler,
}

impl QrPrinterApp {
    pub fn new(config: AppConfig, store: SettingsStore) -> (Self, Task<Message>) {
        let services = Services::system(&config);
        let orchestrator = Orchestrator::new(config, services, Box::new(MessageBox), store);

        (
            Self {
                orchestrator,
                link: String::new(),
                edit_menu_open: false,
                shortcuts: ShortcutHandler::new(),
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::LinkChanged(link) => self.link = link,
            Message::Download => {
                self.edit_menu_open = false;
                self.orchestrator.download(&self.link);
            }
            Message::Print => {
                self.edit_menu_open = false;
                self.orchestrator.print();
            }
            Message::PrinterSelected(name) => self.orchestrator.select_printer(name),
            Message::ToggleEditMenu => self.edit_menu_open = !self.edit_menu_open,
            Message::Edit(action) => {
                self.edit_menu_open = false;
                self.apply_edit(action);
            }
            Message::EventOccurred(event) => {
                if let Event::Keyboard(keyboard::Event::KeyPressed { key, modifiers, .. }) = event {
                    return self.handle_shortcut(self.shortcuts.handle_key(&key, modifiers));
                }
            }
        }
        Task::none()
    }

    fn handle_shortcut(&mut self, action: ShortcutAction) -> Task<Message> {
        match action {
            ShortcutAction::Download => self.update(Message::Download),
            ShortcutAction::Print => self.update(Message::Print),
            ShortcutAction::CloseMenu => {
                self.edit_menu_open = false;
                Task::none()
            }
            ShortcutAction::Quit => iced::exit(),
            ShortcutAction::None => Task::none(),
        }
    }

    fn apply_edit(&mut self, action: EditAction) {
        let result = arboard::Clipboard::new()
            .and_then(|mut clipboard| input::apply_edit(action, &mut self.link, &mut clipboard));
        if let Err(e) = result {
            tracing::warn!("Clipboard {} failed: {}", action.label(), e);
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let link_field = mouse_area(
            text_input("https://...", &self.link)
                .on_input(Message::LinkChanged)
                .on_submit(Message::Download)
                .width(Length::Fixed(420.0)),
        )
        .on_right_press(Message::ToggleEditMenu);

        let mut content = column![text("Enter a link:"), link_field]
            .spacing(10)
            .align_x(Alignment::Center);

        if self.edit_menu_open {
            let menu = EditAction::ALL.iter().fold(row![].spacing(5), |menu, action| {
                menu.push(
                    button(text(action.label()).size(12))
                        .on_press(Message::Edit(*action))
                        .padding([2, 8]),
                )
            });
            content = content.push(menu);
        }

        let preview: Element<'_, Message> = match self.orchestrator.preview() {
            Some(preview) => {
                let (width, height) = preview.dimensions();
                image(preview.handle().clone())
                    .width(Length::Fixed(width as f32))
                    .height(Length::Fixed(height as f32))
                    .into()
            }
            None => container(text("No image loaded").size(14))
                .width(Length::Fixed(200.0))
                .height(Length::Fixed(200.0))
                .center_x(Length::Fixed(200.0))
                .center_y(Length::Fixed(200.0))
                .into(),
        };

        let printers = pick_list(
            self.orchestrator.printers(),
            self.orchestrator.selected_printer().map(str::to_string),
            Message::PrinterSelected,
        )
        .placeholder("Select a printer");

        content = content
            .push(button("Download QR code").on_press(Message::Download))
            .push(preview)
            .push(button("Print").on_press(Message::Print))
            .push(printers);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(10)
            .center_x(Length::Fill)
            .into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        keyboard::listen().map(|event| Message::EventOccurred(Event::Keyboard(event)))
    }
}
