// tests/common/mod.rs - Simulated companion app for driving the reconciler
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use printwatch::device::{DeviceDriver, DeviceError};
use printwatch::screen::{Bounds, Point};

const SCREEN_WIDTH: i32 = 1080;
const ENTRY_TOP: i32 = 200;
const ENTRY_HEIGHT: i32 = 200;
const ENTRY_GAP: i32 = 20;

/// One job as the app knows it.
#[derive(Debug, Clone)]
pub struct SimJob {
    pub name: String,
    pub status: String,
    pub date: String,
    pub duration: String,
    pub machine: String,
    pub weight: Option<String>,
    pub materials: Vec<String>,
}

impl SimJob {
    pub fn new(name: &str, status: &str, date: &str, machine: &str) -> Self {
        Self {
            name: name.to_string(),
            status: status.to_string(),
            date: date.to_string(),
            duration: "90min".to_string(),
            machine: machine.to_string(),
            weight: Some("12.5g".to_string()),
            materials: vec!["PLA Basic".to_string()],
        }
    }

    pub fn without_details(mut self) -> Self {
        self.weight = None;
        self.materials.clear();
        self
    }

    fn entry_desc(&self) -> String {
        format!(
            "\u{200B}Cover\n{}\n{}\n{}\n{}\nPlate 1 ({})",
            self.status, self.name, self.duration, self.machine, self.date
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Home,
    Me,
    History,
    Detail(usize),
    Devices,
    DeviceList,
    Device(String),
}

struct Element {
    desc: String,
    bounds: Bounds,
    long_clickable: bool,
}

fn element(desc: &str, bounds: Bounds) -> Element {
    Element {
        desc: desc.to_string(),
        bounds,
        long_clickable: false,
    }
}

fn row(index: usize) -> Bounds {
    let top = ENTRY_TOP + index as i32 * (ENTRY_HEIGHT + ENTRY_GAP);
    Bounds::new(0, top, SCREEN_WIDTH, top + ENTRY_HEIGHT)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\n', "&#10;")
}

struct AppState {
    page: Page,
    offset: usize,
    window: usize,
    /// Newest first, as the history list shows them.
    jobs: Vec<SimJob>,
    warnings: HashMap<String, String>,
    arrival: Option<(usize, SimJob)>,
    history_dumps: usize,
    dumps: usize,
    swipes: usize,
    taps: Vec<Point>,
}

impl AppState {
    fn tabs() -> Vec<Element> {
        vec![
            element("Devices", Bounds::new(0, 2200, 540, 2400)),
            element("Me", Bounds::new(540, 2200, 1080, 2400)),
        ]
    }

    fn machines(&self) -> Vec<String> {
        let mut machines: Vec<String> = self.jobs.iter().map(|j| j.machine.clone()).collect();
        machines.sort();
        machines.dedup();
        machines
    }

    fn elements(&self) -> Vec<Element> {
        let back = element("Back", Bounds::new(0, 60, 120, 160));
        match &self.page {
            Page::Home => Self::tabs(),
            Page::Me => {
                let mut elements = vec![element("Printing History", Bounds::new(0, 300, 1080, 400))];
                elements.extend(Self::tabs());
                elements
            }
            Page::History => {
                let mut elements = vec![back];
                let visible = self.jobs.iter().skip(self.offset).take(self.window);
                for (i, job) in visible.enumerate() {
                    elements.push(Element {
                        desc: job.entry_desc(),
                        bounds: row(i),
                        long_clickable: true,
                    });
                }
                elements
            }
            Page::Detail(index) => {
                let job = &self.jobs[*index];
                let mut labels = vec![job.name.clone()];
                if let Some(weight) = &job.weight {
                    labels.push("Filaments".to_string());
                    labels.push(weight.clone());
                    labels.extend(job.materials.iter().cloned());
                    labels.extend((1..=job.materials.len()).map(|slot| format!("A{slot}")));
                }
                labels.push("Print Again".to_string());
                let mut elements = vec![back];
                elements.extend(labels.iter().enumerate().map(|(i, l)| element(l, row(i))));
                elements
            }
            Page::Devices => {
                let mut elements = vec![element("brand_logo", Bounds::new(0, 200, 200, 300))];
                elements.extend(Self::tabs());
                elements
            }
            Page::DeviceList => {
                let mut elements: Vec<Element> = self
                    .machines()
                    .iter()
                    .enumerate()
                    .map(|(i, m)| element(m, row(i)))
                    .collect();
                elements.extend(Self::tabs());
                elements
            }
            Page::Device(machine) => {
                let mut labels = vec![machine.clone()];
                if let Some(text) = self.warnings.get(machine) {
                    labels.push(text.clone());
                    labels.push("Warning".to_string());
                }
                labels.iter().enumerate().map(|(i, l)| element(l, row(i))).collect()
            }
        }
    }

    fn render(&self) -> String {
        let mut xml = String::from(
            "<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>\n<hierarchy rotation=\"0\">\n",
        );
        xml.push_str("  <node index=\"0\" content-desc=\"\" long-clickable=\"false\" bounds=\"[0,0][1080,2400]\">\n");
        for (i, e) in self.elements().iter().enumerate() {
            xml.push_str(&format!(
                "    <node index=\"{}\" content-desc=\"{}\" long-clickable=\"{}\" bounds=\"{}\" />\n",
                i,
                escape(&e.desc),
                e.long_clickable,
                e.bounds
            ));
        }
        xml.push_str("  </node>\n</hierarchy>\n");
        xml
    }

    fn contains(bounds: &Bounds, at: Point) -> bool {
        at.x >= bounds.left && at.x <= bounds.right && at.y >= bounds.top && at.y <= bounds.bottom
    }

    fn tap(&mut self, at: Point) {
        self.taps.push(at);
        let Some(desc) = self
            .elements()
            .into_iter()
            .find(|e| Self::contains(&e.bounds, at))
            .map(|e| (e.desc, e.long_clickable))
        else {
            return;
        };

        self.page = match (&self.page, desc.0.as_str(), desc.1) {
            (Page::History, _, true) => {
                let slot = ((at.y - ENTRY_TOP) / (ENTRY_HEIGHT + ENTRY_GAP)) as usize;
                Page::Detail(self.offset + slot)
            }
            (Page::History, "Back", _) => Page::Me,
            (Page::Detail(_), "Back", _) => Page::History,
            (_, "Me", _) => Page::Me,
            (_, "Devices", _) => Page::Devices,
            (Page::Me, "Printing History", _) => {
                self.offset = 0;
                Page::History
            }
            (Page::Devices, "brand_logo", _) => Page::DeviceList,
            (Page::DeviceList, machine, _) => Page::Device(machine.to_string()),
            (page, _, _) => page.clone(),
        };
    }

    fn swipe(&mut self, from: Point, to: Point) {
        self.swipes += 1;
        if self.page != Page::History || from.y == to.y {
            return;
        }
        if from.y > to.y {
            let last = self.jobs.len().saturating_sub(self.window);
            self.offset = (self.offset + 1).min(last);
        } else {
            self.offset = self.offset.saturating_sub(1);
        }
    }
}

/// A companion app with a home tab, a history list, job detail pages and device pages.
pub struct SimulatedApp {
    state: Mutex<AppState>,
}

impl SimulatedApp {
    /// `jobs` are newest first; `window` entries of the history are visible at once.
    pub fn new(jobs: Vec<SimJob>, window: usize) -> Self {
        Self {
            state: Mutex::new(AppState {
                page: Page::Home,
                offset: 0,
                window,
                jobs,
                warnings: HashMap::new(),
                arrival: None,
                history_dumps: 0,
                dumps: 0,
                swipes: 0,
                taps: Vec::new(),
            }),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut AppState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_status(&self, name: &str, status: &str) {
        self.with_state(|s| {
            for job in s.jobs.iter_mut().filter(|j| j.name == name) {
                job.status = status.to_string();
            }
        });
    }

    pub fn push_newest(&self, job: SimJob) {
        self.with_state(|s| s.jobs.insert(0, job));
    }

    pub fn set_warning(&self, machine: &str, text: &str) {
        self.with_state(|s| s.warnings.insert(machine.to_string(), text.to_string()));
    }

    /// Add `job` to the top of the history just before the `n`th history dump renders.
    pub fn arrive_at_history_dump(&self, n: usize, job: SimJob) {
        self.with_state(|s| {
            s.history_dumps = 0;
            s.arrival = Some((n, job));
        });
    }

    pub fn page(&self) -> Page {
        self.with_state(|s| s.page.clone())
    }

    pub fn dumps(&self) -> usize {
        self.with_state(|s| s.dumps)
    }

    pub fn swipes(&self) -> usize {
        self.with_state(|s| s.swipes)
    }
}

#[async_trait]
impl DeviceDriver for SimulatedApp {
    async fn dump_screen(&self) -> Result<String, DeviceError> {
        Ok(self.with_state(|s| {
            s.dumps += 1;
            if s.page == Page::History {
                s.history_dumps += 1;
                let due = matches!(&s.arrival, Some((n, _)) if *n == s.history_dumps);
                if due {
                    if let Some((_, job)) = s.arrival.take() {
                        s.jobs.insert(0, job);
                    }
                }
            }
            s.render()
        }))
    }

    async fn tap(&self, at: Point) -> Result<(), DeviceError> {
        self.with_state(|s| s.tap(at));
        Ok(())
    }

    async fn swipe(&self, from: Point, to: Point) -> Result<(), DeviceError> {
        self.with_state(|s| s.swipe(from, to));
        Ok(())
    }

    async fn press_back(&self) -> Result<(), DeviceError> {
        self.with_state(|s| s.page = Page::Home);
        Ok(())
    }
}

/// Replays fixed dumps in order, then either repeats the last one or cycles.
pub struct ScriptedDevice {
    screens: Vec<String>,
    cycle: bool,
    cursor: Mutex<usize>,
    swipes: Mutex<usize>,
}

impl ScriptedDevice {
    pub fn new(screens: Vec<String>) -> Self {
        Self {
            screens,
            cycle: false,
            cursor: Mutex::new(0),
            swipes: Mutex::new(0),
        }
    }

    pub fn cycling(screens: Vec<String>) -> Self {
        Self {
            cycle: true,
            ..Self::new(screens)
        }
    }

    pub fn dumps(&self) -> usize {
        *self.cursor.lock().unwrap()
    }

    pub fn swipes(&self) -> usize {
        *self.swipes.lock().unwrap()
    }
}

#[async_trait]
impl DeviceDriver for ScriptedDevice {
    async fn dump_screen(&self) -> Result<String, DeviceError> {
        let mut cursor = self.cursor.lock().unwrap();
        let index = if self.cycle {
            *cursor % self.screens.len()
        } else {
            (*cursor).min(self.screens.len() - 1)
        };
        *cursor += 1;
        Ok(self.screens[index].clone())
    }

    async fn tap(&self, _at: Point) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn swipe(&self, _from: Point, _to: Point) -> Result<(), DeviceError> {
        *self.swipes.lock().unwrap() += 1;
        Ok(())
    }

    async fn press_back(&self) -> Result<(), DeviceError> {
        Ok(())
    }
}

/// A history screen listing `(status, name, date)` entries top to bottom.
pub fn history_screen(entries: &[(&str, &str, &str)]) -> String {
    let mut xml = String::from("<hierarchy rotation=\"0\">\n");
    for (i, (status, name, date)) in entries.iter().enumerate() {
        let desc = format!("Cover\n{status}\n{name}\n2h\nX1C-01\nPlate 1 ({date})");
        xml.push_str(&format!(
            "  <node content-desc=\"{}\" long-clickable=\"true\" bounds=\"{}\" />\n",
            escape(&desc),
            row(i)
        ));
    }
    xml.push_str("</hierarchy>\n");
    xml
}
