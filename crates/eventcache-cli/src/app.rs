//! Front-end state: one coordinator plus the router that renders views.

use std::sync::Arc;

use anyhow::{Context, Result};
use eventcache_core::{
    ApiClient, ChannelNavigator, Config, ErrorNotice, Event, EventCoordinator, EventId,
    EventPatch, QueryCache, Route,
};
use tokio::sync::mpsc;
use tracing::debug;

use crate::cli::{event_id, CreateArgs, EventCommand, OutputFormat, PatchArgs};
use crate::form;
use crate::output;

/// Navigation requests buffered between renders
const ROUTE_BUFFER_SIZE: usize = 16;

pub struct App {
    coordinator: EventCoordinator<ApiClient>,
    routes: mpsc::Receiver<Route>,
    base_url: String,
    format: OutputFormat,
    current: Route,
}

impl App {
    pub fn new(config: &Config, format: OutputFormat) -> Result<Self> {
        let client = ApiClient::with_timeout(&config.api_base_url, config.request_timeout())
            .context("Failed to build HTTP client")?;
        let base_url = client.base_url().to_string();
        let (tx, routes) = mpsc::channel(ROUTE_BUFFER_SIZE);
        let coordinator =
            EventCoordinator::new(client, QueryCache::new(), Arc::new(ChannelNavigator::new(tx)))
                .with_options(config.coordinator_options());

        Ok(Self {
            coordinator,
            routes,
            base_url,
            format,
            current: Route::Events,
        })
    }

    pub fn current_route(&self) -> &Route {
        &self.current
    }

    /// Run one command and render wherever it navigated to. Returns false
    /// when the operation failed and a notice was shown.
    pub async fn run(&mut self, command: EventCommand) -> Result<bool> {
        debug!(?command, "Running command");
        let ok = match command {
            EventCommand::List => {
                self.current = Route::Events;
                self.show_list().await
            }
            EventCommand::Show { id } => {
                let id = event_id(&id);
                self.current = Route::EventDetails(id.clone());
                self.show_event(&id).await
            }
            EventCommand::Create(args) => self.create(args).await?,
            EventCommand::Edit { id, patch } => self.edit(event_id(&id), patch).await?,
            EventCommand::Delete { id, yes } => self.delete(event_id(&id), yes).await?,
        };
        let rendered = self.follow_routes().await;
        Ok(ok && rendered)
    }

    /// Re-read the list now.
    pub async fn refresh(&mut self) -> bool {
        self.current = Route::Events;
        match self.coordinator.refresh_events().await {
            Ok(events) => {
                self.print_events(&events);
                true
            }
            Err(err) => {
                self.print_notice(&ErrorNotice::list_failed(&err));
                false
            }
        }
    }

    pub fn print_status(&self) {
        let cache = self.coordinator.cache();
        let entries: Vec<_> = cache
            .keys()
            .into_iter()
            .map(|key| {
                let status = cache.status(&key);
                let fetching = cache.is_fetching(&key);
                (key, status, fetching)
            })
            .collect();
        println!("{}", output::format_status(&entries));
    }

    pub fn shutdown(&self) {
        self.coordinator.teardown();
    }

    async fn follow_routes(&mut self) -> bool {
        let mut ok = true;
        while let Ok(route) = self.routes.try_recv() {
            debug!(route = %route, "Navigating");
            ok &= self.render(route).await;
        }
        ok
    }

    async fn render(&mut self, route: Route) -> bool {
        self.current = route.clone();
        match route {
            Route::Events => self.show_list().await,
            Route::EventDetails(id) => self.show_event(&id).await,
            Route::NewEvent | Route::EditEvent(_) => true,
        }
    }

    async fn show_list(&self) -> bool {
        match self.coordinator.events().await {
            Ok(events) => {
                self.print_events(&events);
                true
            }
            Err(err) => {
                self.print_notice(&ErrorNotice::list_failed(&err));
                false
            }
        }
    }

    async fn show_event(&self, id: &EventId) -> bool {
        match self.coordinator.event_details(id).await {
            Ok(event) => {
                match self.format {
                    OutputFormat::Json => println!("{}", output::format_output(&event, self.format)),
                    OutputFormat::Pretty => println!("{}", output::format_event(&event, &self.base_url)),
                }
                true
            }
            Err(err) => {
                self.print_notice(&ErrorNotice::details_failed(&err));
                false
            }
        }
    }

    async fn create(&mut self, args: CreateArgs) -> Result<bool> {
        self.current = Route::NewEvent;
        let fields = match args.into_fields() {
            Some(fields) => fields,
            None => form::new_event()?,
        };
        match self.coordinator.create_event(fields).await {
            Ok(event) => {
                if self.format == OutputFormat::Pretty {
                    println!("Created event {}", event.id);
                }
                Ok(true)
            }
            Err(err) => {
                self.print_notice(&ErrorNotice::create_failed(&err));
                Ok(false)
            }
        }
    }

    async fn edit(&mut self, id: EventId, args: PatchArgs) -> Result<bool> {
        self.current = Route::EditEvent(id.clone());
        let mut patch = EventPatch::from(args);
        if patch.is_empty() {
            let current = match self.coordinator.event_for_edit(&id).await {
                Ok(event) => event,
                Err(err) => {
                    self.print_notice(&ErrorNotice::load_failed(&err));
                    return Ok(false);
                }
            };
            patch = form::edit_event(&current)?;
        }
        if patch.is_empty() {
            println!("Nothing to change.");
            return Ok(true);
        }
        match self.coordinator.update_event(&id, patch).await {
            Ok(_) => Ok(true),
            Err(err) => {
                self.print_notice(&ErrorNotice::update_failed(&err));
                Ok(false)
            }
        }
    }

    async fn delete(&mut self, id: EventId, yes: bool) -> Result<bool> {
        self.current = Route::EventDetails(id.clone());
        let title = match self.coordinator.event_details(&id).await {
            Ok(event) => event.title,
            Err(err) => {
                self.print_notice(&ErrorNotice::details_failed(&err));
                return Ok(false);
            }
        };

        let mut confirmation = self.coordinator.request_delete(id);
        if !yes && !form::confirm_delete(&title)? {
            confirmation.cancel();
            println!("Cancelled.");
            return Ok(true);
        }

        loop {
            match confirmation.confirm().await {
                Ok(()) => {
                    if self.format == OutputFormat::Pretty {
                        println!("Deleted event {}", confirmation.id());
                    }
                    return Ok(true);
                }
                Err(err) => {
                    self.print_notice(&ErrorNotice::delete_failed(&err));
                    if yes || !form::confirm_retry()? {
                        return Ok(false);
                    }
                }
            }
        }
    }

    fn print_events(&self, events: &[Event]) {
        match self.format {
            OutputFormat::Json => println!("{}", output::format_output(&events, self.format)),
            OutputFormat::Pretty => println!("{}", output::format_events(events)),
        }
    }

    fn print_notice(&self, notice: &ErrorNotice) {
        eprintln!("{}", output::format_notice(notice));
    }
}
