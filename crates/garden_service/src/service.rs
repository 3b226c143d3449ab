use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use garden_core::calendar::Calendar;
use garden_core::content::{
    select_content, ContentMessage, ContentSubject, CursorStore, MemoryCursorStore, TemplateVars,
};
use garden_core::habit::{CheckIn, Habit, HabitId, UserId, MAX_ACTIVE_HABITS};
use garden_core::milestone::{check_milestones, Milestone};
use garden_core::mood::{habit_mood, MoodResult};
use garden_core::notifications::{missed, reengagement, reminder, streak_celebration, weekly_summary};
use garden_core::rates::{self, GlobalStats, HabitStats};
use garden_core::schedule::is_tracked_day;
use garden_core::streak::{calculate_streak, StreakInfo};
use garden_core::zone::{atmosphere, zone_state, Atmosphere, ZoneState};
use garden_core::{GardenError, GardenResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::cache::StreakCache;
use crate::memory::MemoryStore;
use crate::notifications::{NotificationRequest, NotificationSink};
use crate::requests::{CheckInRequest, ContentRequest, HabitUpdateRequest, HistoryRequest, NewHabitRequest};
use crate::store::{CheckInUpsert, DateRange, GardenStore};

/// Days of history the garden view reads; covers the 14-day zone window.
const GARDEN_WINDOW_DAYS: i64 = 14;

/// Quiet days after which per-habit reminders give way to one re-engagement nudge.
const REENGAGE_AFTER_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GardenZone {
    pub habit_id: HabitId,
    pub name: String,
    pub emoji_buddy: String,
    pub sort_order: i32,
    pub mood: MoodResult,
    pub days_tracked: u32,
    pub completion_rate_7_days: f64,
    pub completion_rate_14_days: f64,
    pub zone_state: ZoneState,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GardenSnapshot {
    pub zones: Vec<GardenZone>,
    pub atmosphere: Atmosphere,
    pub average_completion_rate: f64,
    pub habit_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckInOutcome {
    pub check_in: CheckIn,
    /// `false` when an existing check-in for the day was updated.
    pub created: bool,
    pub streak: StreakInfo,
    pub milestones: Vec<Milestone>,
}

pub struct GardenService {
    store: Arc<dyn GardenStore>,
    cursors: Arc<dyn CursorStore>,
    notification_sink: Option<Box<dyn NotificationSink>>,
    streaks: StreakCache,
    zone: Tz,
}

pub struct GardenServiceBuilder {
    store: Option<Arc<dyn GardenStore>>,
    cursors: Option<Arc<dyn CursorStore>>,
    notification_sink: Option<Box<dyn NotificationSink>>,
    zone: Tz,
}

impl GardenServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            cursors: None,
            notification_sink: None,
            zone: Tz::UTC,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn GardenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cursor_store(mut self, cursors: Arc<dyn CursorStore>) -> Self {
        self.cursors = Some(cursors);
        self
    }

    pub fn with_notification_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    pub fn with_timezone(mut self, zone: Tz) -> Self {
        self.zone = zone;
        self
    }

    pub fn build(self) -> GardenService {
        GardenService {
            store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
            cursors: self.cursors.unwrap_or_else(|| Arc::new(MemoryCursorStore::new())),
            notification_sink: self.notification_sink,
            streaks: StreakCache::new(),
            zone: self.zone,
        }
    }
}

impl Default for GardenServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GardenService {
    pub fn builder() -> GardenServiceBuilder {
        GardenServiceBuilder::new()
    }

    /// Calendar for a request arriving now in the service's zone.
    pub fn calendar(&self) -> Calendar {
        Calendar::now(self.zone)
    }

    pub fn store(&self) -> &dyn GardenStore {
        self.store.as_ref()
    }

    fn owned_habit(&self, user_id: UserId, habit_id: HabitId) -> GardenResult<Habit> {
        self.store
            .habit(user_id, habit_id)?
            .ok_or(GardenError::NotFound { habit_id })
    }

    fn all_check_ins(&self, habit: &Habit) -> GardenResult<Vec<CheckIn>> {
        Ok(self.store.check_ins(habit.user_id, habit.id, DateRange::all())?)
    }

    fn streak_for(&self, habit: &Habit, calendar: &Calendar) -> GardenResult<StreakInfo> {
        if let Some(info) = self.streaks.get(habit.id, calendar) {
            return Ok(info);
        }
        let check_ins = self.all_check_ins(habit)?;
        let info = calculate_streak(habit, &check_ins, calendar);
        self.streaks.insert(habit.id, calendar, info.clone());
        Ok(info)
    }

    pub fn list_habits(&self, user_id: UserId) -> GardenResult<Vec<Habit>> {
        Ok(self.store.habits(user_id)?)
    }

    #[instrument(skip(self, calendar))]
    pub fn streak(&self, user_id: UserId, habit_id: HabitId, calendar: &Calendar) -> GardenResult<StreakInfo> {
        let habit = self.owned_habit(user_id, habit_id)?;
        self.streak_for(&habit, calendar)
    }

    /// Moods, zone states and weather for the user's active habits.
    #[instrument(skip(self, calendar))]
    pub fn garden(&self, user_id: UserId, calendar: &Calendar) -> GardenResult<GardenSnapshot> {
        let mut habits = self.store.active_habits(user_id)?;
        habits.sort_by_key(|habit| habit.sort_order);

        let since = calendar.days_ago(GARDEN_WINDOW_DAYS - 1);
        let mut by_habit: HashMap<HabitId, Vec<CheckIn>> = HashMap::new();
        for check_in in self.store.check_ins_for_user(user_id, DateRange::since(since))? {
            by_habit.entry(check_in.habit_id).or_default().push(check_in);
        }

        let empty: Vec<CheckIn> = Vec::new();
        let grouped: Vec<(&Habit, &[CheckIn])> = habits
            .iter()
            .map(|habit| (habit, by_habit.get(&habit.id).unwrap_or(&empty).as_slice()))
            .collect();

        let zones: Vec<GardenZone> = grouped
            .iter()
            .map(|(habit, check_ins)| {
                let mood = habit_mood(habit, check_ins, calendar);
                let rate_14 = rates::fourteen_day_rate(habit, check_ins, calendar);
                GardenZone {
                    habit_id: habit.id,
                    name: habit.name.clone(),
                    emoji_buddy: habit.emoji_buddy.clone(),
                    sort_order: habit.sort_order,
                    mood: mood.mood,
                    days_tracked: mood.days_tracked,
                    completion_rate_7_days: mood.completion_rate_7_days,
                    completion_rate_14_days: rate_14,
                    zone_state: zone_state(rate_14),
                }
            })
            .collect();

        let average = rates::average_fourteen_day_rate(grouped.iter().copied(), calendar);
        debug!(habits = average.habit_count, average = average.average, "garden computed");
        Ok(GardenSnapshot {
            zones,
            atmosphere: atmosphere(average.average, average.habit_count),
            average_completion_rate: average.average,
            habit_count: average.habit_count,
        })
    }

    #[instrument(skip(self, calendar))]
    pub fn content(
        &self,
        user_id: UserId,
        request: &ContentRequest,
        calendar: &Calendar,
    ) -> GardenResult<ContentMessage> {
        let habit = self.owned_habit(user_id, request.habit_id)?;
        let streak = self.streak_for(&habit, calendar)?;
        let check_ins = self.all_check_ins(&habit)?;
        let subject = ContentSubject {
            habit_id: habit.id,
            direction: habit.direction,
            vars: TemplateVars {
                streak: streak.current_streak,
                habit_name: habit.name.clone(),
                buddy: habit.emoji_buddy.clone(),
                completion_7d: rates::completion_rate(&check_ins, 7, calendar).rate,
                completion_30d: rates::completion_rate(&check_ins, 30, calendar).rate,
                days_since_start: habit.days_since_creation(calendar),
                best_streak: streak.longest_streak,
                total_checkins: streak.total_check_ins,
            },
        };
        Ok(select_content(
            self.cursors.as_ref(),
            &subject,
            request.kind,
            &request.options,
        ))
    }

    /// Records today's outcome, then awards any milestone the new streak reaches.
    #[instrument(skip(self, calendar))]
    pub fn check_in(
        &self,
        user_id: UserId,
        request: &CheckInRequest,
        calendar: &Calendar,
    ) -> GardenResult<CheckInOutcome> {
        let habit = self.owned_habit(user_id, request.habit_id)?;
        let now = Utc::now();
        let upserted = self.store.upsert_check_in(CheckInUpsert {
            habit_id: habit.id,
            user_id,
            date: calendar.today(),
            completed: request.completed,
            value: request.value,
            at: now,
        })?;
        self.streaks.invalidate(habit.id);
        let streak = self.streak_for(&habit, calendar)?;

        let owned = self.store.milestones_for_user(user_id)?;
        let mut rng = rand::thread_rng();
        let earned = check_milestones(&habit, &owned, streak.current_streak, &mut rng);
        let mut milestones = Vec::with_capacity(earned.len());
        for milestone in earned {
            let inserted = self.store.insert_milestone(milestone, now)?;
            if !inserted.created {
                debug!(habit_id = habit.id, kind = inserted.milestone.kind.as_str(), "milestone already held");
                continue;
            }
            let stored = inserted.milestone;
            info!(
                habit_id = habit.id,
                kind = stored.kind.as_str(),
                cosmetic = %stored.cosmetic.value,
                "milestone earned"
            );
            if let Some(sink) = &self.notification_sink {
                sink.schedule(NotificationRequest {
                    user_id,
                    habit_id: Some(habit.id),
                    message: streak_celebration(
                        streak.current_streak,
                        &stored.cosmetic.value,
                        &habit.emoji_buddy,
                        &mut rng,
                    ),
                    scheduled_for: now,
                });
            }
            milestones.push(stored);
        }

        Ok(CheckInOutcome {
            check_in: upserted.check_in,
            created: upserted.created,
            streak,
            milestones,
        })
    }

    /// Builds today's reminders and hands them to the sink.
    ///
    /// A user with no check-in on any active habit for the past
    /// `REENGAGE_AFTER_DAYS` days gets a single re-engagement message.
    /// Otherwise each habit scheduled today without an entry yet gets a
    /// reminder, or a streak warning while a streak is running.
    #[instrument(skip(self, calendar))]
    pub fn nudges(&self, user_id: UserId, calendar: &Calendar) -> GardenResult<Vec<NotificationRequest>> {
        let mut habits = self.store.active_habits(user_id)?;
        if habits.is_empty() {
            return Ok(Vec::new());
        }
        habits.sort_by_key(|habit| habit.sort_order);
        let now = Utc::now();
        let mut rng = rand::thread_rng();

        let recent = self
            .store
            .check_ins_for_user(user_id, DateRange::since(calendar.days_ago(REENGAGE_AFTER_DAYS - 1)))?;
        let quiet = !habits
            .iter()
            .any(|habit| recent.iter().any(|check_in| check_in.habit_id == habit.id && check_in.has_entry()));
        let settled = habits
            .iter()
            .any(|habit| habit.days_since_creation(calendar) >= REENGAGE_AFTER_DAYS);

        let mut nudges = Vec::new();
        if quiet && settled {
            nudges.push(NotificationRequest {
                user_id,
                habit_id: None,
                message: reengagement(&mut rng),
                scheduled_for: now,
            });
        } else {
            for habit in &habits {
                if !is_tracked_day(habit, calendar.today()) {
                    continue;
                }
                let logged_today = recent.iter().any(|check_in| {
                    check_in.habit_id == habit.id && calendar.is_today(check_in.date) && check_in.has_entry()
                });
                if logged_today {
                    continue;
                }
                let streak = self.streak_for(habit, calendar)?;
                let message = if streak.current_streak > 0 {
                    missed(&habit.name, streak.current_streak, &mut rng)
                } else {
                    reminder(&habit.name, &habit.emoji_buddy, &mut rng)
                };
                nudges.push(NotificationRequest {
                    user_id,
                    habit_id: Some(habit.id),
                    message,
                    scheduled_for: reminder_at(habit, calendar).unwrap_or(now),
                });
            }
        }

        debug!(count = nudges.len(), "nudges built");
        self.deliver(&nudges);
        Ok(nudges)
    }

    /// Summary of the past seven days across the user's active habits.
    #[instrument(skip(self, calendar))]
    pub fn weekly_digest(&self, user_id: UserId, calendar: &Calendar) -> GardenResult<NotificationRequest> {
        let habits = self.store.active_habits(user_id)?;
        let check_ins = self
            .store
            .check_ins_for_user(user_id, DateRange::since(calendar.days_ago(6)))?;
        let mut on_track = 0;
        for habit in &habits {
            let own: Vec<CheckIn> = check_ins
                .iter()
                .filter(|check_in| check_in.habit_id == habit.id)
                .cloned()
                .collect();
            if rates::seven_day_rate(habit, &own, calendar) >= 50.0 {
                on_track += 1;
            }
        }
        let summary = format!("{on_track} of {} habits on track", habits.len());
        let digest = NotificationRequest {
            user_id,
            habit_id: None,
            message: weekly_summary(&summary, &mut rand::thread_rng()),
            scheduled_for: Utc::now(),
        };
        self.deliver(std::slice::from_ref(&digest));
        Ok(digest)
    }

    fn deliver(&self, notifications: &[NotificationRequest]) {
        if let Some(sink) = &self.notification_sink {
            for notification in notifications {
                sink.schedule(notification.clone());
            }
        }
    }

    #[instrument(skip(self, calendar))]
    pub fn habit_stats(&self, user_id: UserId, habit_id: HabitId, calendar: &Calendar) -> GardenResult<HabitStats> {
        let habit = self.owned_habit(user_id, habit_id)?;
        let check_ins = self.all_check_ins(&habit)?;
        Ok(rates::habit_stats(&habit, &check_ins, calendar))
    }

    #[instrument(skip(self, calendar))]
    pub fn global_stats(&self, user_id: UserId, calendar: &Calendar) -> GardenResult<GlobalStats> {
        let habits = self.store.active_habits(user_id)?;
        let active: HashSet<HabitId> = habits.iter().map(|habit| habit.id).collect();
        let check_ins: Vec<CheckIn> = self
            .store
            .check_ins_for_user(user_id, DateRange::all())?
            .into_iter()
            .filter(|check_in| active.contains(&check_in.habit_id))
            .collect();
        Ok(rates::global_stats(&habits, &check_ins, calendar))
    }

    pub fn milestones(&self, user_id: UserId, habit_id: HabitId) -> GardenResult<Vec<Milestone>> {
        let habit = self.owned_habit(user_id, habit_id)?;
        Ok(self.store.milestones_for_habit(user_id, habit.id)?)
    }

    #[instrument(skip(self))]
    pub fn create_habit(&self, user_id: UserId, request: NewHabitRequest) -> GardenResult<Habit> {
        let active = self.store.active_habits(user_id)?;
        if active.len() >= MAX_ACTIVE_HABITS {
            return Err(GardenError::HabitLimit {
                limit: MAX_ACTIVE_HABITS,
            });
        }
        let new_habit = request.validate(user_id, active.len() as i32, Utc::now())?;
        let habit = self.store.insert_habit(new_habit)?;
        info!(habit_id = habit.id, name = %habit.name, "habit created");
        Ok(habit)
    }

    #[instrument(skip(self))]
    pub fn update_habit(
        &self,
        user_id: UserId,
        habit_id: HabitId,
        request: HabitUpdateRequest,
    ) -> GardenResult<Habit> {
        self.owned_habit(user_id, habit_id)?;
        let update = request.validate()?;
        let habit = self
            .store
            .update_habit(user_id, habit_id, &update, Utc::now())?
            .ok_or(GardenError::NotFound { habit_id })?;
        self.streaks.invalidate(habit_id);
        Ok(habit)
    }

    /// Hides the habit from the garden; its history is kept.
    #[instrument(skip(self))]
    pub fn archive_habit(&self, user_id: UserId, habit_id: HabitId) -> GardenResult<Habit> {
        let habit = self
            .store
            .set_active(user_id, habit_id, false, Utc::now())?
            .ok_or(GardenError::NotFound { habit_id })?;
        self.streaks.invalidate(habit_id);
        if let Some(sink) = &self.notification_sink {
            sink.clear_for_habit(&habit);
        }
        info!(habit_id, "habit archived");
        Ok(habit)
    }

    #[instrument(skip(self))]
    pub fn delete_habit(&self, user_id: UserId, habit_id: HabitId) -> GardenResult<()> {
        let habit = self.owned_habit(user_id, habit_id)?;
        if !self.store.delete_habit(user_id, habit_id)? {
            return Err(GardenError::NotFound { habit_id });
        }
        self.streaks.invalidate(habit_id);
        if let Some(sink) = &self.notification_sink {
            sink.clear_for_habit(&habit);
        }
        info!(habit_id, "habit deleted");
        Ok(())
    }

    /// Past check-ins, newest first.
    pub fn check_in_history(&self, user_id: UserId, request: &HistoryRequest) -> GardenResult<Vec<CheckIn>> {
        let check_ins = match request.habit_id {
            Some(habit_id) => self.store.check_ins(user_id, habit_id, request.range)?,
            None => self.store.check_ins_for_user(user_id, request.range)?,
        };
        Ok(check_ins)
    }
}

/// The habit's reminder time today in the calendar's zone.
fn reminder_at(habit: &Habit, calendar: &Calendar) -> Option<DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(habit.reminder_time.as_deref()?, "%H:%M").ok()?;
    calendar
        .zone()
        .from_local_datetime(&calendar.today().and_time(time))
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use garden_core::content::{ContentContext, MessageKind};
    use garden_core::milestone::MilestoneKind;
    use garden_core::milestone::{Cosmetic, CosmeticCategory, NewMilestone};
    use garden_core::mood::Mood;
    use garden_core::notifications::NotificationKind;

    use crate::notifications::RecordingSink;
    use crate::store::{HabitUpdate, InsertedMilestone, NewHabit, UpsertedCheckIn};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 20).unwrap()
    }

    fn calendar() -> Calendar {
        Calendar::utc(today())
    }

    fn new_habit(name: &str, created_at: DateTime<Utc>, sort_order: i32) -> NewHabit {
        NewHabit {
            user_id: 1,
            name: name.to_string(),
            emoji_buddy: "🐢".to_string(),
            direction: Default::default(),
            tracking: Default::default(),
            frequency: Default::default(),
            custom_days: vec![false; 7],
            reminder_time: None,
            sort_order,
            created_at,
        }
    }

    fn days_old(age_days: i64) -> DateTime<Utc> {
        Utc.from_utc_datetime(&(today() - Duration::days(age_days)).and_hms_opt(6, 0, 0).unwrap())
    }

    fn seeded(store: &MemoryStore, name: &str, age_days: i64, sort_order: i32) -> Habit {
        store.insert_habit(new_habit(name, days_old(age_days), sort_order)).unwrap()
    }

    fn complete(store: &MemoryStore, habit: &Habit, days_ago: impl IntoIterator<Item = i64>) {
        for offset in days_ago {
            let date = today() - Duration::days(offset);
            store
                .upsert_check_in(CheckInUpsert {
                    habit_id: habit.id,
                    user_id: habit.user_id,
                    date,
                    completed: Some(true),
                    value: None,
                    at: Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap()),
                })
                .unwrap();
        }
    }

    fn service_with(store: Arc<MemoryStore>) -> GardenService {
        GardenService::builder().with_store(store).build()
    }

    #[test]
    fn unknown_or_foreign_habit_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let habit = seeded(&store, "Read", 10, 0);
        let service = service_with(store);
        assert!(service.streak(1, 999, &calendar()).unwrap_err().is_not_found());
        assert!(service.streak(2, habit.id, &calendar()).unwrap_err().is_not_found());
    }

    #[test]
    fn garden_zones_follow_sort_order() {
        let store = Arc::new(MemoryStore::new());
        let walk = seeded(&store, "Walk", 30, 2);
        let read = seeded(&store, "Read", 30, 0);
        complete(&store, &read, 0..14);
        let service = service_with(store);

        let garden = service.garden(1, &calendar()).unwrap();
        let names: Vec<&str> = garden.zones.iter().map(|zone| zone.name.as_str()).collect();
        assert_eq!(names, vec!["Read", "Walk"]);
        assert_eq!(garden.zones[0].zone_state, ZoneState::Thriving);
        assert_eq!(garden.zones[0].mood.mood, Mood::Ecstatic);
        assert_eq!(garden.zones[1].habit_id, walk.id);
        assert_eq!(garden.zones[1].zone_state, ZoneState::Neglected);
        assert_eq!(garden.habit_count, 2);
        assert_eq!(garden.average_completion_rate, 50.0);
        assert_eq!(garden.atmosphere, Atmosphere::Cloudy);
    }

    #[test]
    fn empty_garden_is_cloudy_with_no_zones() {
        let service = service_with(Arc::new(MemoryStore::new()));
        let garden = service.garden(1, &calendar()).unwrap();
        assert!(garden.zones.is_empty());
        assert_eq!(garden.habit_count, 0);
        assert_eq!(garden.atmosphere, Atmosphere::Cloudy);
    }

    #[test]
    fn seventh_check_in_awards_one_milestone_and_notifies() {
        let store = Arc::new(MemoryStore::new());
        let habit = seeded(&store, "Read", 30, 0);
        complete(&store, &habit, 1..7);
        let sink = Arc::new(RecordingSink::new());
        let service = GardenService::builder()
            .with_store(store)
            .with_notification_sink(Box::new(Arc::clone(&sink)))
            .build();

        let request = CheckInRequest {
            habit_id: habit.id,
            completed: Some(true),
            value: None,
        };
        let outcome = service.check_in(1, &request, &calendar()).unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.streak.current_streak, 7);
        assert_eq!(outcome.milestones.len(), 1);
        assert_eq!(outcome.milestones[0].kind, MilestoneKind::Streak7);
        assert_eq!(sink.scheduled().len(), 1);

        let again = service.check_in(1, &request, &calendar()).unwrap();
        assert!(!again.created);
        assert!(again.milestones.is_empty());
        assert_eq!(service.milestones(1, habit.id).unwrap().len(), 1);
    }

    #[test]
    fn check_in_refreshes_cached_streak() {
        let store = Arc::new(MemoryStore::new());
        let habit = seeded(&store, "Read", 30, 0);
        complete(&store, &habit, 1..3);
        let service = service_with(store);

        assert_eq!(service.streak(1, habit.id, &calendar()).unwrap().current_streak, 2);
        let request = CheckInRequest {
            habit_id: habit.id,
            completed: Some(true),
            value: None,
        };
        service.check_in(1, &request, &calendar()).unwrap();
        let info = service.streak(1, habit.id, &calendar()).unwrap();
        assert_eq!(info.current_streak, 3);
        assert!(info.is_active_today);
    }

    #[test]
    fn content_rotates_through_pool() {
        let store = Arc::new(MemoryStore::new());
        let habit = seeded(&store, "Read", 30, 0);
        complete(&store, &habit, 0..5);
        let service = service_with(store);

        let mut request = ContentRequest::new(habit.id, MessageKind::Encouragement);
        request.options.context = Some(ContentContext::StreakActive);
        let first = service.content(1, &request, &calendar()).unwrap();
        let second = service.content(1, &request, &calendar()).unwrap();
        assert_ne!(first.message, second.message);
        assert_eq!(first.context, Some(ContentContext::StreakActive));
        assert!(!first.message.contains('{'));
    }

    #[test]
    fn habit_limit_blocks_fourth_active_habit() {
        let service = service_with(Arc::new(MemoryStore::new()));
        for name in ["Read", "Walk", "Stretch"] {
            let request = NewHabitRequest {
                name: name.into(),
                emoji_buddy: "🐢".into(),
                ..NewHabitRequest::default()
            };
            service.create_habit(1, request).unwrap();
        }
        let fourth = NewHabitRequest {
            name: "Journal".into(),
            emoji_buddy: "🦊".into(),
            ..NewHabitRequest::default()
        };
        let err = service.create_habit(1, fourth.clone()).unwrap_err();
        assert!(matches!(err, GardenError::HabitLimit { limit: 3 }));

        let first = service.list_habits(1).unwrap().pop().unwrap();
        service.archive_habit(1, first.id).unwrap();
        let created = service.create_habit(1, fourth).unwrap();
        assert_eq!(created.sort_order, 2);
    }

    #[test]
    fn update_rejects_protected_fields_after_ownership_check() {
        let store = Arc::new(MemoryStore::new());
        let habit = seeded(&store, "Read", 3, 0);
        let service = service_with(store);
        let protected = HabitUpdateRequest {
            direction: Some(serde_json::json!("break")),
            ..HabitUpdateRequest::default()
        };
        assert!(service.update_habit(2, habit.id, protected.clone()).unwrap_err().is_not_found());
        assert!(matches!(
            service.update_habit(1, habit.id, protected).unwrap_err(),
            GardenError::ProtectedField("direction")
        ));

        let rename = HabitUpdateRequest {
            name: Some("Read daily".into()),
            ..HabitUpdateRequest::default()
        };
        assert_eq!(service.update_habit(1, habit.id, rename).unwrap().name, "Read daily");
    }

    #[test]
    fn delete_removes_history() {
        let store = Arc::new(MemoryStore::new());
        let habit = seeded(&store, "Read", 10, 0);
        complete(&store, &habit, 0..3);
        let service = service_with(Arc::clone(&store));

        service.delete_habit(1, habit.id).unwrap();
        assert!(service.check_in_history(1, &HistoryRequest::default()).unwrap().is_empty());
        assert!(service.delete_habit(1, habit.id).unwrap_err().is_not_found());
    }

    #[test]
    fn global_stats_ignore_archived_habits() {
        let store = Arc::new(MemoryStore::new());
        let read = seeded(&store, "Read", 30, 0);
        let walk = seeded(&store, "Walk", 30, 1);
        complete(&store, &read, 0..7);
        complete(&store, &walk, 0..2);
        let service = service_with(Arc::clone(&store));
        service.archive_habit(1, walk.id).unwrap();

        let stats = service.global_stats(1, &calendar()).unwrap();
        assert_eq!(stats.habit_count, 1);
        assert_eq!(stats.total_check_ins, 7);
        assert_eq!(stats.combined_streak, 7);
    }

    #[test]
    fn streak_follows_the_calendar_zone() {
        let store = Arc::new(MemoryStore::new());
        let late_evening = Utc.with_ymd_and_hms(2025, 6, 19, 23, 0, 0).unwrap();
        let habit = store.insert_habit(new_habit("Read", late_evening, 0)).unwrap();
        complete(&store, &habit, [0]);
        let service = service_with(Arc::clone(&store));

        let tokyo = Calendar::new(today(), Tz::Asia__Tokyo);
        let check_ins = store.check_ins(1, habit.id, DateRange::all()).unwrap();
        assert_eq!(service.streak(1, habit.id, &calendar()).unwrap().completion_rate, 50);
        let in_tokyo = service.streak(1, habit.id, &tokyo).unwrap();
        assert_eq!(in_tokyo, calculate_streak(&habit, &check_ins, &tokyo));
        assert_eq!(in_tokyo.completion_rate, 100);
    }

    /// Delegates to `MemoryStore` but never reports owned milestones, the way
    /// a second writer racing the same check-in sees the table.
    struct StaleMilestoneReads(Arc<MemoryStore>);

    impl GardenStore for StaleMilestoneReads {
        fn habit(&self, user_id: UserId, habit_id: HabitId) -> anyhow::Result<Option<Habit>> {
            self.0.habit(user_id, habit_id)
        }

        fn habits(&self, user_id: UserId) -> anyhow::Result<Vec<Habit>> {
            self.0.habits(user_id)
        }

        fn active_habits(&self, user_id: UserId) -> anyhow::Result<Vec<Habit>> {
            self.0.active_habits(user_id)
        }

        fn check_ins(&self, user_id: UserId, habit_id: HabitId, range: DateRange) -> anyhow::Result<Vec<CheckIn>> {
            self.0.check_ins(user_id, habit_id, range)
        }

        fn check_ins_for_user(&self, user_id: UserId, range: DateRange) -> anyhow::Result<Vec<CheckIn>> {
            self.0.check_ins_for_user(user_id, range)
        }

        fn milestones_for_habit(&self, user_id: UserId, habit_id: HabitId) -> anyhow::Result<Vec<Milestone>> {
            self.0.milestones_for_habit(user_id, habit_id)
        }

        fn milestones_for_user(&self, _user_id: UserId) -> anyhow::Result<Vec<Milestone>> {
            Ok(Vec::new())
        }

        fn upsert_check_in(&self, upsert: CheckInUpsert) -> anyhow::Result<UpsertedCheckIn> {
            self.0.upsert_check_in(upsert)
        }

        fn insert_milestone(
            &self,
            milestone: NewMilestone,
            earned_at: DateTime<Utc>,
        ) -> anyhow::Result<InsertedMilestone> {
            self.0.insert_milestone(milestone, earned_at)
        }

        fn insert_habit(&self, habit: NewHabit) -> anyhow::Result<Habit> {
            self.0.insert_habit(habit)
        }

        fn update_habit(
            &self,
            user_id: UserId,
            habit_id: HabitId,
            update: &HabitUpdate,
            at: DateTime<Utc>,
        ) -> anyhow::Result<Option<Habit>> {
            self.0.update_habit(user_id, habit_id, update, at)
        }

        fn set_active(
            &self,
            user_id: UserId,
            habit_id: HabitId,
            active: bool,
            at: DateTime<Utc>,
        ) -> anyhow::Result<Option<Habit>> {
            self.0.set_active(user_id, habit_id, active, at)
        }

        fn delete_habit(&self, user_id: UserId, habit_id: HabitId) -> anyhow::Result<bool> {
            self.0.delete_habit(user_id, habit_id)
        }
    }

    #[test]
    fn milestone_held_by_a_concurrent_writer_is_not_reannounced() {
        let store = Arc::new(MemoryStore::new());
        let habit = seeded(&store, "Read", 30, 0);
        complete(&store, &habit, 1..7);
        let earlier = store
            .insert_milestone(
                NewMilestone {
                    habit_id: habit.id,
                    user_id: 1,
                    kind: MilestoneKind::Streak7,
                    cosmetic: Cosmetic {
                        category: CosmeticCategory::Hat,
                        value: "👑".to_string(),
                    },
                    streak_snapshot: 7,
                },
                days_old(0),
            )
            .unwrap();
        assert!(earlier.created);

        let sink = Arc::new(RecordingSink::new());
        let service = GardenService::builder()
            .with_store(Arc::new(StaleMilestoneReads(Arc::clone(&store))))
            .with_notification_sink(Box::new(Arc::clone(&sink)))
            .build();
        let request = CheckInRequest {
            habit_id: habit.id,
            completed: Some(true),
            value: None,
        };
        let outcome = service.check_in(1, &request, &calendar()).unwrap();
        assert_eq!(outcome.streak.current_streak, 7);
        assert!(outcome.milestones.is_empty());
        assert!(sink.scheduled().is_empty());
        assert_eq!(store.milestones_for_habit(1, habit.id).unwrap(), vec![earlier.milestone]);
    }

    #[test]
    fn nudges_cover_habits_without_an_entry_today() {
        let store = Arc::new(MemoryStore::new());
        let read = seeded(&store, "Read", 30, 0);
        complete(&store, &read, 1..4);
        let mut walk = new_habit("Walk", days_old(30), 1);
        walk.reminder_time = Some("08:30".to_string());
        let walk = store.insert_habit(walk).unwrap();
        let stretch = seeded(&store, "Stretch", 30, 2);
        complete(&store, &stretch, [0]);
        let sink = Arc::new(RecordingSink::new());
        let service = GardenService::builder()
            .with_store(store)
            .with_notification_sink(Box::new(Arc::clone(&sink)))
            .build();

        let nudges = service.nudges(1, &calendar()).unwrap();
        assert_eq!(nudges.len(), 2);
        assert_eq!(nudges[0].habit_id, Some(read.id));
        assert_eq!(nudges[0].message.kind, NotificationKind::Missed);
        assert_eq!(nudges[1].habit_id, Some(walk.id));
        assert_eq!(nudges[1].message.kind, NotificationKind::Reminder);
        assert_eq!(
            nudges[1].scheduled_for,
            Utc.with_ymd_and_hms(2025, 6, 20, 8, 30, 0).unwrap()
        );
        assert_eq!(sink.scheduled(), nudges);

        service.archive_habit(1, walk.id).unwrap();
        assert_eq!(sink.scheduled().len(), 1);
    }

    #[test]
    fn quiet_week_gets_one_reengagement_message() {
        let store = Arc::new(MemoryStore::new());
        let read = seeded(&store, "Read", 30, 0);
        seeded(&store, "Walk", 30, 1);
        complete(&store, &read, [10, 11]);
        let service = service_with(store);

        let nudges = service.nudges(1, &calendar()).unwrap();
        assert_eq!(nudges.len(), 1);
        assert_eq!(nudges[0].habit_id, None);
        assert_eq!(nudges[0].message.kind, NotificationKind::Reengagement);
    }

    #[test]
    fn new_habit_gets_a_reminder_not_reengagement() {
        let store = Arc::new(MemoryStore::new());
        let read = seeded(&store, "Read", 2, 0);
        let service = service_with(store);

        let nudges = service.nudges(1, &calendar()).unwrap();
        assert_eq!(nudges.len(), 1);
        assert_eq!(nudges[0].habit_id, Some(read.id));
        assert_eq!(nudges[0].message.kind, NotificationKind::Reminder);
        assert!(service.nudges(2, &calendar()).unwrap().is_empty());
    }

    #[test]
    fn weekly_digest_counts_habits_on_track() {
        let store = Arc::new(MemoryStore::new());
        let read = seeded(&store, "Read", 30, 0);
        seeded(&store, "Walk", 30, 1);
        complete(&store, &read, 0..7);
        let service = service_with(store);

        let digest = service.weekly_digest(1, &calendar()).unwrap();
        assert_eq!(digest.habit_id, None);
        assert_eq!(digest.message.kind, NotificationKind::WeeklySummary);
        assert_eq!(
            digest.message.body,
            "This week: 1 of 2 habits on track, your garden is looking good!"
        );
    }
}
